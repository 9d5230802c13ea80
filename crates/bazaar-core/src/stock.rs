//! Product variants and the stock ledger.
//!
//! A variant's stock never goes below zero: it is a `u32` here and carries a
//! `CHECK (stock >= 0)` in storage. Every change to it, manual or automatic,
//! is recorded as an append-only [`StockAdjustment`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, catalog::ProductId, order::OrderId};

pub type VariantId = i64;

// ─── Variant ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
  pub variant_id: VariantId,
  pub product_id: ProductId,
  pub size:       String,
  pub color:      String,
  pub stock:      u32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ProductVariant {
  /// Take `quantity` units out of stock, or fail and leave stock unchanged.
  pub fn deduct_stock(&mut self, quantity: u32) -> Result<()> {
    match self.stock.checked_sub(quantity) {
      Some(remaining) => {
        self.stock = remaining;
        Ok(())
      }
      None => Err(Error::InsufficientStock {
        variant_id: self.variant_id,
        requested:  quantity,
        available:  self.stock,
      }),
    }
  }
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdjustmentReason {
  ManualAddition,
  ManualReduction,
  /// Taken by order fulfilment; the ledger row carries the order id.
  AutomaticDeduction,
}

/// A planned, not yet recorded, change to a variant's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
  pub reason: AdjustmentReason,
  /// Signed; never zero.
  pub delta:  i64,
}

impl StockChange {
  /// Plan a manual adjustment from `current` to `new_level`.
  ///
  /// Returns `None` when the levels are equal: a zero-delta adjustment is not
  /// an audit event.
  pub fn plan(current: u32, new_level: u32) -> Option<Self> {
    let delta = i64::from(new_level) - i64::from(current);
    match delta {
      0 => None,
      d if d < 0 => Some(Self { reason: AdjustmentReason::ManualReduction, delta: d }),
      d => Some(Self { reason: AdjustmentReason::ManualAddition, delta: d }),
    }
  }

  pub fn deduction(quantity: u32) -> Self {
    Self {
      reason: AdjustmentReason::AutomaticDeduction,
      delta:  -i64::from(quantity),
    }
  }
}

/// A recorded ledger row. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
  pub adjustment_id: Uuid,
  pub variant_id:    VariantId,
  pub reason:        AdjustmentReason,
  pub delta:         i64,
  pub order_id:      Option<OrderId>,
  pub recorded_at:   DateTime<Utc>,
}

impl StockAdjustment {
  pub fn record(variant_id: VariantId, change: StockChange, order_id: Option<OrderId>) -> Self {
    Self {
      adjustment_id: Uuid::new_v4(),
      variant_id,
      reason: change.reason,
      delta: change.delta,
      order_id,
      recorded_at: Utc::now(),
    }
  }
}

// ─── Read model ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeColor {
  pub size:  String,
  pub color: String,
}

/// What the stock page shows for a single variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDetails {
  pub variant_id:    VariantId,
  pub product_name:  String,
  pub variant:       SizeColor,
  pub current_stock: u32,
}
