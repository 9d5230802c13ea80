//! Read models for the order pages of the dashboard.
//!
//! These are projections computed by the store (the `order_totals` and
//! `order_item_subtotals` views), never written directly.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, order::{OrderId, OrderStatus}};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemSubtotal {
  /// `"<product> size: <size> color: <color>"`.
  pub product_name: String,
  pub quantity:     u32,
  pub unit_price:   i64,
  pub subtotal:     i64,
}

/// An order with its customer and computed monetary total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotal {
  #[serde(rename = "id")]
  pub order_id:         OrderId,
  pub customer_name:    String,
  pub customer_address: String,
  pub payment_method:   String,
  pub total:            i64,
  pub status:           OrderStatus,
  /// Empty in list results; populated by single-order reads.
  pub items:            Vec<OrderItemSubtotal>,
}

/// One page of [`OrderTotal`] rows, ordered by ascending order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
  pub total:  u64,
  pub pages:  u64,
  pub page:   u32,
  pub limit:  u32,
  pub orders: Vec<OrderTotal>,
}

/// A validated `(page, limit)` pair; pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page:  u32,
  pub limit: u32,
}

impl PageRequest {
  pub fn new(page: u32, limit: u32) -> Result<Self> {
    if page == 0 || limit == 0 {
      return Err(Error::InvalidPage);
    }
    Ok(Self { page, limit })
  }

  pub fn offset(self) -> u64 { u64::from(self.page - 1) * u64::from(self.limit) }

  /// `ceil(total / limit)`.
  pub fn page_count(self, total: u64) -> u64 { total.div_ceil(u64::from(self.limit)) }
}
