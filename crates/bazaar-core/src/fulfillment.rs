//! The pure half of order fulfilment.
//!
//! [`plan`] applies a confirmation to a loaded [`OrderAggregate`] and, when the
//! order is accepted for fulfilment, deducts every line from its variant's
//! stock. It touches no storage: a backend loads the aggregate, calls `plan`,
//! then writes the order, the variants and the ledger rows in one transaction.

use std::collections::BTreeMap;

use crate::{
  Result,
  order::{OrderAggregate, OrderConfirmation, OrderLine, Transition},
  stock::{ProductVariant, StockAdjustment, StockChange, VariantId},
};

/// One line's worth of stock taken by fulfilment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDeduction {
  pub item_id:    i64,
  pub variant_id: VariantId,
  pub quantity:   u32,
}

/// Everything a backend must persist after a successful [`plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fulfillment {
  pub transition: Transition,
  /// Empty unless the transition was `created → processed`.
  pub deductions: Vec<StockDeduction>,
}

impl Fulfillment {
  /// Ledger rows recording the deductions, one per order line.
  pub fn ledger_entries(&self, order_id: i64) -> Vec<StockAdjustment> {
    self
      .deductions
      .iter()
      .map(|d| {
        StockAdjustment::record(d.variant_id, StockChange::deduction(d.quantity), Some(order_id))
      })
      .collect()
  }
}

/// Apply `confirmation` to `aggregate`.
///
/// All-or-nothing: if the state machine rejects the confirmation, or any line
/// lacks stock, `aggregate` is left exactly as it was.
pub fn plan(
  aggregate: &mut OrderAggregate,
  confirmation: &OrderConfirmation,
) -> Result<Fulfillment> {
  let mut order = aggregate.order.clone();
  let transition = order.confirm(confirmation)?;

  let mut items = aggregate.items.clone();
  let deductions = if transition.requires_stock_deduction() {
    deduct_lines(&mut items)?
  } else {
    Vec::new()
  };

  aggregate.order = order;
  aggregate.items = items;
  Ok(Fulfillment { transition, deductions })
}

/// Deduct every line against a working copy of the variants. Lines sharing a
/// variant draw from the same running total.
fn deduct_lines(items: &mut [OrderLine]) -> Result<Vec<StockDeduction>> {
  let mut working: BTreeMap<VariantId, ProductVariant> = BTreeMap::new();
  let mut deductions = Vec::with_capacity(items.len());

  for line in items.iter() {
    working
      .entry(line.variant.variant_id)
      .or_insert_with(|| line.variant.clone())
      .deduct_stock(line.quantity)?;
    deductions.push(StockDeduction {
      item_id:    line.item_id,
      variant_id: line.variant.variant_id,
      quantity:   line.quantity,
    });
  }

  for line in items.iter_mut() {
    if let Some(v) = working.get(&line.variant.variant_id) {
      line.variant.stock = v.stock;
    }
  }

  Ok(deductions)
}
