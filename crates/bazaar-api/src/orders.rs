//! Handlers for `/orders` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/orders` | `?page=&limit=`, defaults 1 and 10 |
//! | `GET`  | `/orders/{id}` | Includes item subtotals; 404 if not found |
//! | `PUT`  | `/orders/{id}` | Body: `{"accept":true,"trackingNumber":"..."}` |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
};
use bazaar_core::{
  order::{OrderConfirmation, OrderId},
  store::CommerceStore,
  view::OrderTotal,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{
  ApiState,
  envelope::{DataPage, Envelope},
  error::ApiError,
};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub page:  Option<u32>,
  pub limit: Option<u32>,
}

/// `GET /orders[?page=<n>&limit=<n>]`
///
/// Zero is treated like an absent value.
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<DataPage<OrderTotal>>, ApiError>
where
  S: CommerceStore,
{
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let page = params.page.filter(|&p| p > 0).unwrap_or(DEFAULT_PAGE);
  let limit = params.limit.filter(|&l| l > 0).unwrap_or(DEFAULT_LIMIT);

  let result = state
    .store
    .list_orders(page, limit)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(DataPage {
    status:       true,
    message:      "orders retrieved".to_string(),
    total:        result.total,
    pages:        result.pages,
    current_page: result.page,
    per_page:     result.limit,
    data:         result.orders,
  }))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /orders/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  id: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Envelope<OrderTotal>>, ApiError>
where
  S: CommerceStore,
{
  let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let order = state
    .store
    .get_order(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::store(bazaar_core::Error::OrderNotFound(id)))?;
  Ok(Json(Envelope::ok("order retrieved", order)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /orders/{id}`: confirm, reject or ship an order.
///
/// The store call is cancelled if the client goes away or the request
/// timeout elapses. On timeout the handler still waits for the store to
/// answer, so the response reflects what was actually committed.
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  id: Result<Path<OrderId>, PathRejection>,
  body: Result<Json<OrderConfirmation>, JsonRejection>,
) -> Result<Json<Envelope<()>>, ApiError>
where
  S: CommerceStore,
{
  let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let Json(confirmation) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  let token = CancellationToken::new();
  let _guard = token.clone().drop_guard();

  let update = state.store.update_order(id, confirmation, token.clone());
  tokio::pin!(update);

  let result = match tokio::time::timeout(state.config.request_timeout, &mut update).await {
    Ok(result) => result,
    Err(_) => {
      tracing::warn!(order_id = id, "order update timed out; cancelling");
      token.cancel();
      update.await
    }
  };
  result.map_err(ApiError::store)?;

  Ok(Json(Envelope::ok("order status updated", ())))
}
