//! Catalogue entities the order subsystem reads from.
//!
//! Customers and products are created through store-level setup operations
//! only (seeding, tests); the REST surface never writes them.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, stock::VariantId};

pub type CustomerId = i64;
pub type ProductId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
  pub customer_id: CustomerId,
  pub name:        String,
  pub address:     String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub product_id: ProductId,
  pub name:       String,
  /// Minor currency units. Copied onto order items when an order is placed.
  pub price:      i64,
}

/// Input to [`crate::store::CommerceStore::add_variant`].
#[derive(Debug, Clone)]
pub struct NewVariant {
  pub product_id: ProductId,
  pub size:       String,
  pub color:      String,
  pub stock:      u32,
}

// ─── Placing orders ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewOrderItem {
  pub variant_id: VariantId,
  pub quantity:   u32,
}

/// Input to [`crate::store::CommerceStore::place_order`]. The order always
/// starts out `created`; unit prices are snapshotted by the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub customer_id:    CustomerId,
  pub payment_method: String,
  pub items:          Vec<NewOrderItem>,
}

impl NewOrder {
  pub fn validate(&self) -> Result<()> {
    if self.items.is_empty() {
      return Err(Error::EmptyOrder);
    }
    if self.items.iter().any(|i| i.quantity == 0) {
      return Err(Error::InvalidQuantity);
    }
    Ok(())
  }
}
