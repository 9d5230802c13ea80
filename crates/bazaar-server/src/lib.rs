//! HTTP server wiring for Bazaar: configuration, the traced router, and demo
//! data seeding.

pub mod seed;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use bazaar_api::{ApiConfig, api_router};
use bazaar_core::store::CommerceStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `BAZAAR_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("bazaar.db") }

fn default_request_timeout_secs() -> u64 { 30 }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig { request_timeout: Duration::from_secs(self.request_timeout_secs) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn router<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: CommerceStore + Send + Sync + 'static,
{
  api_router(store, config.api_config()).layer(TraceLayer::new_for_http())
}
