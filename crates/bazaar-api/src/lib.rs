//! JSON REST API for Bazaar.
//!
//! Exposes an axum [`Router`] backed by any [`bazaar_core::store::CommerceStore`].
//! Auth, TLS, and request tracing are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(bazaar_api::api_router(store.clone(), ApiConfig::default()))
//! ```

pub mod envelope;
pub mod error;
pub mod orders;
pub mod stock;

use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use bazaar_core::store::CommerceStore;

pub use error::ApiError;

/// Tunables for the API handlers.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// How long an order update may run before it is cancelled.
  pub request_timeout: Duration,
}

impl Default for ApiConfig {
  fn default() -> Self { Self { request_timeout: Duration::from_secs(30) } }
}

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub config: ApiConfig,
}

// Not derived: `S` itself need not be `Clone`.
impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), config: self.config.clone() }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, config: ApiConfig) -> Router<()>
where
  S: CommerceStore + Send + Sync + 'static,
{
  Router::new()
    // Orders
    .route("/orders", get(orders::list::<S>))
    .route("/orders/{id}", get(orders::get_one::<S>).put(orders::update::<S>))
    // Stock
    .route("/stock/{variant_id}", get(stock::details::<S>).put(stock::edit::<S>))
    .route("/stock/{variant_id}/history", get(stock::history::<S>))
    .with_state(ApiState { store, config })
}

// ─── Router tests ─────────────────────────────────────────────────────────────
