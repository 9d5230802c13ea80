//! Success bodies. Every response carries `status` and `message`; errors are
//! built by [`crate::ApiError`] in the same shape without `data`.

use serde::Serialize;

/// `{"status": true, "message": ..., "data": ...}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  pub status:  bool,
  pub message: String,
  pub data:    T,
}

impl<T> Envelope<T> {
  pub fn ok(message: impl Into<String>, data: T) -> Self {
    Self { status: true, message: message.into(), data }
  }
}

/// A page of results with the paging counters alongside `data`.
#[derive(Debug, Serialize)]
pub struct DataPage<T> {
  pub status:       bool,
  pub message:      String,
  pub total:        u64,
  pub pages:        u64,
  pub current_page: u32,
  pub per_page:     u32,
  pub data:         Vec<T>,
}
