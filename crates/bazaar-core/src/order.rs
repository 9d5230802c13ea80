//! Orders and the order status state machine.
//!
//! ```text
//! created ──accept──▶ processed ──accept + tracking no.──▶ completed
//!    │                    │
//!    └──reject──▶ canceled ◀──reject──┘
//! ```
//!
//! `completed` and `canceled` are terminal. The transition table lives in a
//! single exhaustive `match` ([`next_status`]) so adding a status forces every
//! path to be reconsidered at compile time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  Error, Result,
  catalog::CustomerId,
  stock::ProductVariant,
};

pub type OrderId = i64;

// ─── Status ──────────────────────────────────────────────────────────────────

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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
  Created,
  Processed,
  Canceled,
  Completed,
}

// ─── Confirmation ────────────────────────────────────────────────────────────

/// An administrator's decision on an order. Transient; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
  pub accept:          bool,
  /// Only consulted when accepting a `processed` order.
  #[serde(default)]
  pub tracking_number: Option<String>,
}

impl OrderConfirmation {
  pub fn accept() -> Self { Self { accept: true, tracking_number: None } }

  pub fn reject() -> Self { Self { accept: false, tracking_number: None } }

  pub fn ship(tracking_number: impl Into<String>) -> Self {
    Self { accept: true, tracking_number: Some(tracking_number.into()) }
  }
}

// ─── Transition ──────────────────────────────────────────────────────────────

/// The outcome of applying a confirmation to an order in a given status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
  pub from:            OrderStatus,
  pub to:              OrderStatus,
  /// Set only on `processed → completed`.
  pub tracking_number: Option<String>,
}

impl Transition {
  /// Inventory is taken exactly once, when an order is accepted for
  /// fulfilment.
  pub fn requires_stock_deduction(&self) -> bool {
    self.from == OrderStatus::Created && self.to == OrderStatus::Processed
  }
}

/// Decide the next status for an order currently in `current`.
///
/// Pure: nothing is mutated. Fails with [`Error::InvalidStatus`] for terminal
/// statuses and [`Error::MissingTrackingNumber`] when shipping without one.
pub fn next_status(
  current: OrderStatus,
  confirmation: &OrderConfirmation,
) -> Result<Transition> {
  match current {
    OrderStatus::Created => Ok(process_step(confirmation)),
    OrderStatus::Processed => ship_step(confirmation),
    OrderStatus::Canceled | OrderStatus::Completed => {
      Err(Error::InvalidStatus(current))
    }
  }
}

fn process_step(confirmation: &OrderConfirmation) -> Transition {
  let to = if confirmation.accept {
    OrderStatus::Processed
  } else {
    OrderStatus::Canceled
  };
  Transition { from: OrderStatus::Created, to, tracking_number: None }
}

fn ship_step(confirmation: &OrderConfirmation) -> Result<Transition> {
  if !confirmation.accept {
    return Ok(Transition {
      from:            OrderStatus::Processed,
      to:              OrderStatus::Canceled,
      tracking_number: None,
    });
  }

  let tracking_number = confirmation
    .tracking_number
    .as_deref()
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(Error::MissingTrackingNumber)?;

  Ok(Transition {
    from:            OrderStatus::Processed,
    to:              OrderStatus::Completed,
    tracking_number: Some(tracking_number.to_owned()),
  })
}

// ─── Order ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub order_id:        OrderId,
  pub customer_id:     CustomerId,
  pub payment_method:  String,
  pub tracking_number: Option<String>,
  pub status:          OrderStatus,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Order {
  /// Apply `confirmation` according to the current status.
  ///
  /// Exactly one status change happens on success; on error the order is
  /// untouched.
  pub fn confirm(&mut self, confirmation: &OrderConfirmation) -> Result<Transition> {
    match self.status {
      OrderStatus::Created => self.process(confirmation),
      OrderStatus::Processed => self.ship(confirmation),
      status => Err(Error::InvalidStatus(status)),
    }
  }

  /// The `created` step: accept moves to `processed`, reject cancels.
  pub fn process(&mut self, confirmation: &OrderConfirmation) -> Result<Transition> {
    if self.status != OrderStatus::Created {
      return Err(Error::InvalidStatus(self.status));
    }
    let transition = process_step(confirmation);
    self.apply(&transition);
    Ok(transition)
  }

  /// The `processed` step: accept completes with a tracking number, reject
  /// cancels.
  pub fn ship(&mut self, confirmation: &OrderConfirmation) -> Result<Transition> {
    if self.status != OrderStatus::Processed {
      return Err(Error::InvalidStatus(self.status));
    }
    let transition = ship_step(confirmation)?;
    self.apply(&transition);
    Ok(transition)
  }

  fn apply(&mut self, transition: &Transition) {
    self.status = transition.to;
    if let Some(tn) = &transition.tracking_number {
      self.tracking_number = Some(tn.clone());
    }
    self.updated_at = Utc::now();
  }
}

// ─── Items and aggregate ─────────────────────────────────────────────────────

/// An order line inside an [`OrderAggregate`]. Owns a copy of its variant so
/// the aggregate is a plain tree with no back-references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
  pub item_id:    i64,
  pub quantity:   u32,
  pub unit_price: i64,
  pub variant:    ProductVariant,
}

/// An order with its lines, loaded and persisted as one consistency unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAggregate {
  pub order: Order,
  pub items: Vec<OrderLine>,
}
