//! Handlers for `/stock` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/stock/{variant_id}` | Product name, size, color, current stock |
//! | `PUT`  | `/stock/{variant_id}` | Body: `{"newStock":12}` |
//! | `GET`  | `/stock/{variant_id}/history` | Ledger rows, oldest first |

use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
};
use bazaar_core::{
  stock::{StockAdjustment, StockDetails, VariantId},
  store::CommerceStore,
};
use serde::Deserialize;

use crate::{ApiState, envelope::Envelope, error::ApiError};

fn variant_id(path: Result<Path<VariantId>, PathRejection>) -> Result<VariantId, ApiError> {
  path
    .map(|Path(id)| id)
    .map_err(|e| ApiError::BadRequest(e.body_text()))
}

// ─── Details ──────────────────────────────────────────────────────────────────

/// `GET /stock/{variant_id}`
pub async fn details<S>(
  State(state): State<ApiState<S>>,
  path: Result<Path<VariantId>, PathRejection>,
) -> Result<Json<Envelope<StockDetails>>, ApiError>
where
  S: CommerceStore,
{
  let id = variant_id(path)?;
  let details = state
    .store
    .stock_details(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::store(bazaar_core::Error::VariantNotFound(id)))?;
  Ok(Json(Envelope::ok("stock details retrieved", details)))
}

// ─── Edit ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBody {
  pub new_stock: u32,
}

/// `PUT /stock/{variant_id}`: set the absolute stock level.
///
/// `data` is the recorded ledger row, or `null` when the level was already
/// `newStock`.
pub async fn edit<S>(
  State(state): State<ApiState<S>>,
  path: Result<Path<VariantId>, PathRejection>,
  body: Result<Json<EditBody>, JsonRejection>,
) -> Result<Json<Envelope<Option<StockAdjustment>>>, ApiError>
where
  S: CommerceStore,
{
  let id = variant_id(path)?;
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  let adjustment = state
    .store
    .adjust_stock(id, body.new_stock)
    .await
    .map_err(ApiError::store)?;

  let message = if adjustment.is_some() { "stock updated" } else { "stock unchanged" };
  Ok(Json(Envelope::ok(message, adjustment)))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /stock/{variant_id}/history`
pub async fn history<S>(
  State(state): State<ApiState<S>>,
  path: Result<Path<VariantId>, PathRejection>,
) -> Result<Json<Envelope<Vec<StockAdjustment>>>, ApiError>
where
  S: CommerceStore,
{
  let id = variant_id(path)?;
  let rows = state.store.stock_history(id).await.map_err(ApiError::store)?;
  Ok(Json(Envelope::ok("stock history retrieved", rows)))
}
