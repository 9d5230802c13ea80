//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, enums as their snake/lower-case names.

use bazaar_core::{
  order::{Order, OrderLine, OrderStatus},
  stock::{AdjustmentReason, ProductVariant, StockAdjustment},
  view::{OrderItemSubtotal, OrderTotal},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

/// An unrecognised status is a business-rule failure, not corruption: the
/// order simply cannot be confirmed.
pub fn decode_status(s: &str) -> Result<OrderStatus> {
  s.parse()
    .map_err(|_| Error::Core(bazaar_core::Error::UnknownStatus(s.to_owned())))
}

pub fn decode_reason(s: &str) -> Result<AdjustmentReason> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown adjustment reason: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const VARIANT_COLUMNS: &str =
  "v.variant_id, v.product_id, v.size, v.color, v.stock, v.created_at, v.updated_at";

/// Raw values read from a `product_variants` row aliased as `v`.
pub struct RawVariant {
  pub variant_id: i64,
  pub product_id: i64,
  pub size:       String,
  pub color:      String,
  pub stock:      u32,
  pub created_at: String,
  pub updated_at: String,
}

impl RawVariant {
  /// Read [`VARIANT_COLUMNS`] starting at column `at`.
  pub fn from_row_at(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      variant_id: row.get(at)?,
      product_id: row.get(at + 1)?,
      size:       row.get(at + 2)?,
      color:      row.get(at + 3)?,
      stock:      row.get(at + 4)?,
      created_at: row.get(at + 5)?,
      updated_at: row.get(at + 6)?,
    })
  }

  pub fn into_variant(self) -> Result<ProductVariant> {
    Ok(ProductVariant {
      variant_id: self.variant_id,
      product_id: self.product_id,
      size:       self.size,
      color:      self.color,
      stock:      self.stock,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const ORDER_COLUMNS: &str =
  "order_id, customer_id, payment_method, tracking_number, status, created_at, updated_at";

/// Raw values read from an `orders` row.
pub struct RawOrder {
  pub order_id:        i64,
  pub customer_id:     i64,
  pub payment_method:  String,
  pub tracking_number: Option<String>,
  pub status:          String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawOrder {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      order_id:        row.get(0)?,
      customer_id:     row.get(1)?,
      payment_method:  row.get(2)?,
      tracking_number: row.get(3)?,
      status:          row.get(4)?,
      created_at:      row.get(5)?,
      updated_at:      row.get(6)?,
    })
  }

  pub fn into_order(self) -> Result<Order> {
    Ok(Order {
      order_id:        self.order_id,
      customer_id:     self.customer_id,
      payment_method:  self.payment_method,
      tracking_number: self.tracking_number,
      status:          decode_status(&self.status)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// An `order_items` row joined with its variant.
pub struct RawLine {
  pub item_id:    i64,
  pub quantity:   u32,
  pub unit_price: i64,
  pub variant:    RawVariant,
}

impl RawLine {
  pub fn into_line(self) -> Result<OrderLine> {
    Ok(OrderLine {
      item_id:    self.item_id,
      quantity:   self.quantity,
      unit_price: self.unit_price,
      variant:    self.variant.into_variant()?,
    })
  }
}

pub const ADJUSTMENT_COLUMNS: &str =
  "adjustment_id, variant_id, reason, delta, order_id, recorded_at";

/// Raw values read from a `stock_adjustments` row.
pub struct RawAdjustment {
  pub adjustment_id: String,
  pub variant_id:    i64,
  pub reason:        String,
  pub delta:         i64,
  pub order_id:      Option<i64>,
  pub recorded_at:   String,
}

impl RawAdjustment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      adjustment_id: row.get(0)?,
      variant_id:    row.get(1)?,
      reason:        row.get(2)?,
      delta:         row.get(3)?,
      order_id:      row.get(4)?,
      recorded_at:   row.get(5)?,
    })
  }

  pub fn into_adjustment(self) -> Result<StockAdjustment> {
    Ok(StockAdjustment {
      adjustment_id: decode_uuid(&self.adjustment_id)?,
      variant_id:    self.variant_id,
      reason:        decode_reason(&self.reason)?,
      delta:         self.delta,
      order_id:      self.order_id,
      recorded_at:   decode_dt(&self.recorded_at)?,
    })
  }
}

pub const ORDER_TOTAL_COLUMNS: &str =
  "order_id, customer_name, customer_address, payment_method, total, status";

/// Raw values read from the `order_totals` view.
pub struct RawOrderTotal {
  pub order_id:         i64,
  pub customer_name:    String,
  pub customer_address: String,
  pub payment_method:   String,
  pub total:            i64,
  pub status:           String,
}

impl RawOrderTotal {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      order_id:         row.get(0)?,
      customer_name:    row.get(1)?,
      customer_address: row.get(2)?,
      payment_method:   row.get(3)?,
      total:            row.get(4)?,
      status:           row.get(5)?,
    })
  }

  pub fn into_total(self, items: Vec<OrderItemSubtotal>) -> Result<OrderTotal> {
    Ok(OrderTotal {
      order_id: self.order_id,
      customer_name: self.customer_name,
      customer_address: self.customer_address,
      payment_method: self.payment_method,
      total: self.total,
      status: decode_status(&self.status)?,
      items,
    })
  }
}

pub fn read_subtotal(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderItemSubtotal> {
  Ok(OrderItemSubtotal {
    product_name: row.get(0)?,
    quantity:     row.get(1)?,
    unit_price:   row.get(2)?,
    subtotal:     row.get(3)?,
  })
}
