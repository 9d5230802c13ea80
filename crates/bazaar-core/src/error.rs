//! Error types for `bazaar-core`.

use thiserror::Error;

use crate::order::{OrderId, OrderStatus};
use crate::stock::VariantId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("invalid status: cannot confirm an order that is {0}")]
  InvalidStatus(OrderStatus),

  #[error("invalid status: unrecognised order status {0:?}")]
  UnknownStatus(String),

  #[error("invalid tracking number: a non-empty tracking number is required to ship")]
  MissingTrackingNumber,

  #[error("invalid quantity: order item quantity must be positive")]
  InvalidQuantity,

  #[error("an order needs at least one item")]
  EmptyOrder,

  #[error("page and limit must both be at least 1")]
  InvalidPage,

  #[error(
    "insufficient stock for variant {variant_id}: requested {requested}, available {available}"
  )]
  InsufficientStock {
    variant_id: VariantId,
    requested:  u32,
    available:  u32,
  },

  #[error("order not found: {0}")]
  OrderNotFound(OrderId),

  #[error("product variant not found: {0}")]
  VariantNotFound(VariantId),

  #[error("customer not found: {0}")]
  CustomerNotFound(i64),

  #[error("product not found: {0}")]
  ProductNotFound(i64),

  #[error("order not found: page {0} is past the last page")]
  PageNotFound(u32),

  #[error("order {0} was modified concurrently")]
  ConcurrentModification(OrderId),

  #[error("operation cancelled before commit")]
  Cancelled,
}

/// Coarse classification used by transports to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The request breaks a business rule; retrying it unchanged will fail again.
  Validation,
  NotFound,
  InsufficientStock,
  /// Lost a race against another writer.
  Conflict,
  Cancelled,
  /// Storage failure; the only kind that indicates a server fault.
  Persistence,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::InvalidStatus(_)
      | Error::UnknownStatus(_)
      | Error::MissingTrackingNumber
      | Error::InvalidQuantity
      | Error::EmptyOrder
      | Error::InvalidPage => ErrorKind::Validation,
      Error::OrderNotFound(_)
      | Error::VariantNotFound(_)
      | Error::CustomerNotFound(_)
      | Error::ProductNotFound(_)
      | Error::PageNotFound(_) => ErrorKind::NotFound,
      Error::InsufficientStock { .. } => ErrorKind::InsufficientStock,
      Error::ConcurrentModification(_) => ErrorKind::Conflict,
      Error::Cancelled => ErrorKind::Cancelled,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
