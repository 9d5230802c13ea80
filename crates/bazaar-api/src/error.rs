//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bazaar_core::{ErrorKind, store::StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The request could not be decoded (bad path, query or body).
  #[error("bad request: {0}")]
  BadRequest(String),

  /// Any error raised by the store, already classified.
  #[error("{message}")]
  Store { kind: ErrorKind, message: String },
}

impl ApiError {
  /// Classify a store error. Persistence failures are logged here and their
  /// details are kept out of the response body.
  pub fn store<E: StoreError>(err: E) -> Self {
    let kind = err.kind();
    let message = match kind {
      ErrorKind::Persistence => {
        tracing::error!(error = %err, "store failure");
        "server error".to_string()
      }
      _ => err.to_string(),
    };
    ApiError::Store { kind, message }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Store { kind, .. } => match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientStock | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match self {
      ApiError::BadRequest(m) => m,
      ApiError::Store { message, .. } => message,
    };
    (status, Json(json!({ "status": false, "message": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn core_errors_map_to_statuses() {
    let cases = [
      (bazaar_core::Error::MissingTrackingNumber, StatusCode::UNPROCESSABLE_ENTITY),
      (bazaar_core::Error::OrderNotFound(3), StatusCode::NOT_FOUND),
      (
        bazaar_core::Error::InsufficientStock { variant_id: 1, requested: 2, available: 1 },
        StatusCode::CONFLICT,
      ),
      (bazaar_core::Error::ConcurrentModification(3), StatusCode::CONFLICT),
      (bazaar_core::Error::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::store(err).status(), status);
    }
  }

  #[test]
  fn validation_message_is_passed_through() {
    let err = ApiError::store(bazaar_core::Error::InvalidStatus(
      bazaar_core::order::OrderStatus::Canceled,
    ));
    assert_eq!(err.to_string(), "invalid status: cannot confirm an order that is canceled");
  }
}
