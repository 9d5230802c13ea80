//! Integration tests for `SqliteStore` against in-memory and temporary on-disk
//! databases.

use bazaar_core::{
  ErrorKind,
  catalog::{NewOrder, NewOrderItem, NewVariant},
  order::{OrderConfirmation, OrderId, OrderStatus},
  stock::{AdjustmentReason, VariantId},
  store::{CommerceStore, StoreError as _},
};
use std::{
  path::{Path, PathBuf},
  sync::OnceLock,
  time::Duration,
};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn core_err(e: Error) -> bazaar_core::Error {
  e.as_core().cloned().unwrap_or_else(|| panic!("expected a domain error, got {e}"))
}

/// One customer, one product priced 15 000, and a variant per entry in
/// `stocks`.
async fn catalogue(s: &SqliteStore, stocks: &[u32]) -> (i64, Vec<VariantId>) {
  let customer = s
    .add_customer("Budi".into(), "Jl. Merdeka 1, Bandung".into())
    .await
    .unwrap();
  let product = s.add_product("Kaos Polos".into(), 15_000).await.unwrap();

  let mut variants = Vec::new();
  for (i, stock) in stocks.iter().enumerate() {
    let v = s
      .add_variant(NewVariant {
        product_id: product.product_id,
        size:       ["S", "M", "L", "XL"][i % 4].into(),
        color:      "Red".into(),
        stock:      *stock,
      })
      .await
      .unwrap();
    variants.push(v.variant_id);
  }
  (customer.customer_id, variants)
}

async fn order(s: &SqliteStore, customer_id: i64, lines: &[(VariantId, u32)]) -> OrderId {
  s.place_order(NewOrder {
    customer_id,
    payment_method: "bank_transfer".into(),
    items: lines
      .iter()
      .map(|&(variant_id, quantity)| NewOrderItem { variant_id, quantity })
      .collect(),
  })
  .await
  .unwrap()
  .order
  .order_id
}

async fn stock_of(s: &SqliteStore, id: VariantId) -> u32 {
  s.get_variant(id).await.unwrap().unwrap().stock
}

async fn status_of(s: &SqliteStore, id: OrderId) -> OrderStatus {
  s.load_order(id).await.unwrap().unwrap().order.status
}

fn temp_db() -> PathBuf {
  std::env::temp_dir().join(format!("bazaar-test-{}.db", Uuid::new_v4()))
}

fn remove_db(path: &Path) {
  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
  }
}

async fn confirm(
  s: &SqliteStore,
  id: OrderId,
  confirmation: OrderConfirmation,
) -> crate::Result<bazaar_core::order::Transition> {
  s.update_order(id, confirmation, CancellationToken::new()).await
}

// ─── Placing orders ──────────────────────────────────────────────────────────

#[tokio::test]
async fn place_order_snapshots_price_and_leaves_stock() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5]).await;

  let agg = s
    .place_order(NewOrder {
      customer_id:    customer,
      payment_method: "cod".into(),
      items:          vec![NewOrderItem { variant_id: v[0], quantity: 2 }],
    })
    .await
    .unwrap();

  assert_eq!(agg.order.status, OrderStatus::Created);
  assert!(agg.order.tracking_number.is_none());
  assert_eq!(agg.items.len(), 1);
  assert_eq!(agg.items[0].unit_price, 15_000);
  assert_eq!(agg.items[0].variant.variant_id, v[0]);
  assert_eq!(stock_of(&s, v[0]).await, 5);
}

#[tokio::test]
async fn place_order_rejects_bad_input() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5]).await;

  let empty = s
    .place_order(NewOrder { customer_id: customer, payment_method: "cod".into(), items: vec![] })
    .await
    .unwrap_err();
  assert_eq!(core_err(empty), bazaar_core::Error::EmptyOrder);

  let unknown_variant = s
    .place_order(NewOrder {
      customer_id:    customer,
      payment_method: "cod".into(),
      items:          vec![NewOrderItem { variant_id: 999, quantity: 1 }],
    })
    .await
    .unwrap_err();
  assert_eq!(core_err(unknown_variant), bazaar_core::Error::VariantNotFound(999));

  let unknown_customer = s
    .place_order(NewOrder {
      customer_id:    42,
      payment_method: "cod".into(),
      items:          vec![NewOrderItem { variant_id: v[0], quantity: 1 }],
    })
    .await
    .unwrap_err();
  assert_eq!(core_err(unknown_customer), bazaar_core::Error::CustomerNotFound(42));

  // Nothing half-written by the failed placements.
  assert!(s.load_order(1).await.unwrap().is_none());
}

// ─── Fulfilment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn accept_deducts_each_item_exactly_once() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5, 5]).await;
  let id = order(&s, customer, &[(v[0], 3), (v[1], 2)]).await;

  let t = confirm(&s, id, OrderConfirmation::accept()).await.unwrap();
  assert_eq!(t.to, OrderStatus::Processed);

  assert_eq!(status_of(&s, id).await, OrderStatus::Processed);
  assert_eq!(stock_of(&s, v[0]).await, 2);
  assert_eq!(stock_of(&s, v[1]).await, 3);
}

#[tokio::test]
async fn insufficient_stock_on_any_item_changes_nothing() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5, 1]).await;
  let id = order(&s, customer, &[(v[0], 3), (v[1], 2)]).await;

  let err = confirm(&s, id, OrderConfirmation::accept()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InsufficientStock);
  assert_eq!(
    core_err(err),
    bazaar_core::Error::InsufficientStock { variant_id: v[1], requested: 2, available: 1 }
  );

  assert_eq!(status_of(&s, id).await, OrderStatus::Created);
  assert_eq!(stock_of(&s, v[0]).await, 5);
  assert_eq!(stock_of(&s, v[1]).await, 1);
  assert!(s.stock_history(v[0]).await.unwrap().is_empty());
}

#[tokio::test]
async fn reject_from_created_cancels_without_touching_stock() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5]).await;
  let id = order(&s, customer, &[(v[0], 3)]).await;

  confirm(&s, id, OrderConfirmation::reject()).await.unwrap();
  assert_eq!(status_of(&s, id).await, OrderStatus::Canceled);
  assert_eq!(stock_of(&s, v[0]).await, 5);
}

#[tokio::test]
async fn ship_requires_tracking_number() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5]).await;
  let id = order(&s, customer, &[(v[0], 1)]).await;
  confirm(&s, id, OrderConfirmation::accept()).await.unwrap();

  for bad in [OrderConfirmation::accept(), OrderConfirmation::ship("")] {
    let err = confirm(&s, id, bad).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(core_err(err), bazaar_core::Error::MissingTrackingNumber);
    assert_eq!(status_of(&s, id).await, OrderStatus::Processed);
  }

  confirm(&s, id, OrderConfirmation::ship("JNE0012345")).await.unwrap();
  let agg = s.load_order(id).await.unwrap().unwrap();
  assert_eq!(agg.order.status, OrderStatus::Completed);
  assert_eq!(agg.order.tracking_number.as_deref(), Some("JNE0012345"));
  // Shipping takes no further stock.
  assert_eq!(stock_of(&s, v[0]).await, 4);
}

#[tokio::test]
async fn reject_from_processed_cancels_and_keeps_deduction() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5]).await;
  let id = order(&s, customer, &[(v[0], 2)]).await;
  confirm(&s, id, OrderConfirmation::accept()).await.unwrap();

  confirm(&s, id, OrderConfirmation::reject()).await.unwrap();
  assert_eq!(status_of(&s, id).await, OrderStatus::Canceled);
  assert_eq!(stock_of(&s, v[0]).await, 3);
}

#[tokio::test]
async fn terminal_orders_reject_every_confirmation() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[10]).await;

  let canceled = order(&s, customer, &[(v[0], 1)]).await;
  confirm(&s, canceled, OrderConfirmation::reject()).await.unwrap();

  let completed = order(&s, customer, &[(v[0], 1)]).await;
  confirm(&s, completed, OrderConfirmation::accept()).await.unwrap();
  confirm(&s, completed, OrderConfirmation::ship("SICEPAT-1")).await.unwrap();

  let stock_before = stock_of(&s, v[0]).await;
  for (id, status) in [(canceled, OrderStatus::Canceled), (completed, OrderStatus::Completed)] {
    for c in [
      OrderConfirmation::accept(),
      OrderConfirmation::reject(),
      OrderConfirmation::ship("X"),
    ] {
      let err = confirm(&s, id, c).await.unwrap_err();
      assert_eq!(core_err(err), bazaar_core::Error::InvalidStatus(status));
    }
    assert_eq!(status_of(&s, id).await, status);
  }
  assert_eq!(stock_of(&s, v[0]).await, stock_before);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
  let s = store().await;
  let err = confirm(&s, 404, OrderConfirmation::accept()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert_eq!(core_err(err), bazaar_core::Error::OrderNotFound(404));
}

#[tokio::test]
async fn unrecognised_stored_status_is_invalid() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5]).await;
  let id = order(&s, customer, &[(v[0], 1)]).await;

  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE orders SET status = 'shipped' WHERE order_id = ?1",
        rusqlite::params![id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = confirm(&s, id, OrderConfirmation::accept()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert_eq!(core_err(err), bazaar_core::Error::UnknownStatus("shipped".into()));
  assert_eq!(stock_of(&s, v[0]).await, 5);
}

#[tokio::test]
async fn fulfilment_writes_automatic_ledger_rows() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5, 5]).await;
  let id = order(&s, customer, &[(v[0], 3), (v[1], 2)]).await;
  confirm(&s, id, OrderConfirmation::accept()).await.unwrap();

  let history = s.stock_history(v[0]).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].reason, AdjustmentReason::AutomaticDeduction);
  assert_eq!(history[0].delta, -3);
  assert_eq!(history[0].order_id, Some(id));

  let history = s.stock_history(v[1]).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].delta, -2);
}

#[tokio::test]
async fn cancelled_token_writes_nothing() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5]).await;
  let id = order(&s, customer, &[(v[0], 3)]).await;

  let token = CancellationToken::new();
  token.cancel();
  let err = s
    .update_order(id, OrderConfirmation::accept(), token)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Cancelled);

  assert_eq!(status_of(&s, id).await, OrderStatus::Created);
  assert_eq!(stock_of(&s, v[0]).await, 5);
  assert!(s.stock_history(v[0]).await.unwrap().is_empty());

  // The order is still confirmable afterwards.
  confirm(&s, id, OrderConfirmation::accept()).await.unwrap();
  assert_eq!(stock_of(&s, v[0]).await, 2);
}

static CANCEL_WHILE_BUSY: OnceLock<CancellationToken> = OnceLock::new();

/// Busy handler that fires the registered token the first time the store has
/// to wait for the write lock. The store only asks for the lock after its
/// pre-transaction cancellation check has passed.
fn cancel_while_busy(_attempt: i32) -> bool {
  if let Some(token) = CANCEL_WHILE_BUSY.get() {
    token.cancel();
  }
  std::thread::sleep(Duration::from_millis(5));
  true
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_inside_transaction_rolls_back() {
  let path = temp_db();
  let s = SqliteStore::open(&path).await.unwrap();
  let (customer, v) = catalogue(&s, &[5]).await;
  let id = order(&s, customer, &[(v[0], 3)]).await;

  let token = CancellationToken::new();
  CANCEL_WHILE_BUSY.set(token.clone()).unwrap();
  s.conn
    .call(|conn| {
      conn.busy_handler(Some(cancel_while_busy))?;
      Ok(())
    })
    .await
    .unwrap();

  // Hold the write lock from a second connection so the update has to wait.
  let blocker = rusqlite::Connection::open(&path).unwrap();
  blocker.execute_batch("BEGIN IMMEDIATE").unwrap();

  let update = tokio::spawn({
    let s = s.clone();
    let token = token.clone();
    async move { s.update_order(id, OrderConfirmation::accept(), token).await }
  });

  tokio::time::timeout(Duration::from_secs(5), token.cancelled())
    .await
    .expect("store never waited for the write lock");
  blocker.execute_batch("ROLLBACK").unwrap();

  // The update now gets the lock, writes, and must still refuse to commit.
  let err = update.await.unwrap().unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Cancelled);

  assert_eq!(status_of(&s, id).await, OrderStatus::Created);
  assert_eq!(stock_of(&s, v[0]).await, 5);
  assert!(s.stock_history(v[0]).await.unwrap().is_empty());

  drop((s, blocker));
  remove_db(&path);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_deduct_once() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[10]).await;
  let id = order(&s, customer, &[(v[0], 4)]).await;

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move { confirm(&s, id, OrderConfirmation::accept()).await })
    })
    .collect();

  let mut ok = 0;
  for h in handles {
    match h.await.unwrap() {
      Ok(t) => {
        assert_eq!(t.to, OrderStatus::Processed);
        ok += 1;
      }
      // Losers see the order already processed, where a bare accept means
      // "ship" and lacks a tracking number.
      Err(e) => assert_eq!(core_err(e), bazaar_core::Error::MissingTrackingNumber),
    }
  }

  assert_eq!(ok, 1);
  assert_eq!(stock_of(&s, v[0]).await, 6);
  assert_eq!(s.stock_history(v[0]).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn separate_connections_to_one_file_deduct_once() {
  let path = temp_db();
  let a = SqliteStore::open(&path).await.unwrap();
  let (customer, v) = catalogue(&a, &[10]).await;
  let id = order(&a, customer, &[(v[0], 7)]).await;
  let b = SqliteStore::open(&path).await.unwrap();

  let (ra, rb) = tokio::join!(
    tokio::spawn({
      let a = a.clone();
      async move { confirm(&a, id, OrderConfirmation::accept()).await }
    }),
    tokio::spawn({
      let b = b.clone();
      async move { confirm(&b, id, OrderConfirmation::accept()).await }
    }),
  );
  let results = [ra.unwrap(), rb.unwrap()];

  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  assert_eq!(stock_of(&a, v[0]).await, 3);
  assert_eq!(stock_of(&b, v[0]).await, 3);

  drop((a, b));
  remove_db(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn manual_adjustment_and_fulfilment_never_overdraw() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[5]).await;
  let id = order(&s, customer, &[(v[0], 4)]).await;

  let fulfil = tokio::spawn({
    let s = s.clone();
    async move { confirm(&s, id, OrderConfirmation::accept()).await }
  });
  let variant = v[0];
  let adjust = tokio::spawn({
    let s = s.clone();
    async move { s.adjust_stock(variant, 2).await }
  });

  let fulfilled = fulfil.await.unwrap();
  adjust.await.unwrap().unwrap();

  // Whichever ran second saw the other's write: either the order took 4 of 5
  // and the manual set then forced 2, or the level dropped to 2 first and the
  // order could not be fulfilled.
  let stock = stock_of(&s, v[0]).await;
  match fulfilled {
    Ok(_) => assert_eq!(stock, 2),
    Err(e) => {
      assert_eq!(e.kind(), ErrorKind::InsufficientStock);
      assert_eq!(stock, 2);
      assert_eq!(status_of(&s, id).await, OrderStatus::Created);
    }
  }
}

// ─── Stock ledger ────────────────────────────────────────────────────────────

#[tokio::test]
async fn manual_adjustments_record_signed_deltas() {
  let s = store().await;
  let (_, v) = catalogue(&s, &[10]).await;

  let up = s.adjust_stock(v[0], 13).await.unwrap().unwrap();
  assert_eq!(up.reason, AdjustmentReason::ManualAddition);
  assert_eq!(up.delta, 3);
  assert_eq!(up.order_id, None);

  let down = s.adjust_stock(v[0], 4).await.unwrap().unwrap();
  assert_eq!(down.reason, AdjustmentReason::ManualReduction);
  assert_eq!(down.delta, -9);

  assert_eq!(stock_of(&s, v[0]).await, 4);

  let history = s.stock_history(v[0]).await.unwrap();
  assert_eq!(history, vec![up, down]);
}

#[tokio::test]
async fn zero_delta_adjustment_is_a_noop() {
  let s = store().await;
  let (_, v) = catalogue(&s, &[7]).await;

  assert!(s.adjust_stock(v[0], 7).await.unwrap().is_none());
  assert_eq!(stock_of(&s, v[0]).await, 7);
  assert!(s.stock_history(v[0]).await.unwrap().is_empty());
}

#[tokio::test]
async fn adjusting_unknown_variant_is_not_found() {
  let s = store().await;
  let err = s.adjust_stock(77, 1).await.unwrap_err();
  assert_eq!(core_err(err), bazaar_core::Error::VariantNotFound(77));

  let err = s.stock_history(77).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert!(s.stock_details(77).await.unwrap().is_none());
}

#[tokio::test]
async fn stock_details_names_the_variant() {
  let s = store().await;
  let (_, v) = catalogue(&s, &[3, 8]).await;

  let details = s.stock_details(v[1]).await.unwrap().unwrap();
  assert_eq!(details.product_name, "Kaos Polos");
  assert_eq!(details.variant.size, "M");
  assert_eq!(details.variant.color, "Red");
  assert_eq!(details.current_stock, 8);
}

#[tokio::test]
async fn manual_level_is_what_fulfilment_sees() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[1]).await;
  let id = order(&s, customer, &[(v[0], 3)]).await;

  let err = confirm(&s, id, OrderConfirmation::accept()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InsufficientStock);

  s.adjust_stock(v[0], 3).await.unwrap();
  confirm(&s, id, OrderConfirmation::accept()).await.unwrap();
  assert_eq!(stock_of(&s, v[0]).await, 0);

  let reasons: Vec<_> = s
    .stock_history(v[0])
    .await
    .unwrap()
    .into_iter()
    .map(|a| a.reason)
    .collect();
  assert_eq!(
    reasons,
    vec![AdjustmentReason::ManualAddition, AdjustmentReason::AutomaticDeduction]
  );
}

// ─── Order queries ───────────────────────────────────────────────────────────

#[tokio::test]
async fn list_orders_paginates_by_ascending_id() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[100]).await;
  let mut ids = Vec::new();
  for qty in 1..=5 {
    ids.push(order(&s, customer, &[(v[0], qty)]).await);
  }

  let first = s.list_orders(1, 2).await.unwrap();
  assert_eq!(first.total, 5);
  assert_eq!(first.pages, 3);
  assert_eq!(first.orders.iter().map(|o| o.order_id).collect::<Vec<_>>(), ids[..2]);
  assert_eq!(first.orders[1].total, 2 * 15_000);
  assert_eq!(first.orders[0].customer_name, "Budi");

  let last = s.list_orders(3, 2).await.unwrap();
  assert_eq!(last.orders.len(), 1);
  assert_eq!(last.orders[0].order_id, ids[4]);
}

#[tokio::test]
async fn page_past_the_end_is_not_found() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[100]).await;
  order(&s, customer, &[(v[0], 1)]).await;
  order(&s, customer, &[(v[0], 1)]).await;

  let err = s.list_orders(2, 2).await.unwrap_err();
  assert_eq!(core_err(err), bazaar_core::Error::PageNotFound(2));

  // An offset beyond the signed 64-bit range must not wrap back to page 1.
  let err = s.list_orders(u32::MAX, u32::MAX).await.unwrap_err();
  assert_eq!(core_err(err), bazaar_core::Error::PageNotFound(u32::MAX));

  let err = s.list_orders(u32::MAX, 1).await.unwrap_err();
  assert_eq!(core_err(err), bazaar_core::Error::PageNotFound(u32::MAX));

  let err = s.list_orders(0, 10).await.unwrap_err();
  assert_eq!(core_err(err), bazaar_core::Error::InvalidPage);
}

#[tokio::test]
async fn empty_store_has_no_first_page() {
  let s = store().await;
  let err = s.list_orders(1, 10).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn get_order_includes_item_subtotals() {
  let s = store().await;
  let (customer, v) = catalogue(&s, &[10, 10]).await;
  let id = order(&s, customer, &[(v[0], 2), (v[1], 1)]).await;
  confirm(&s, id, OrderConfirmation::accept()).await.unwrap();

  let total = s.get_order(id).await.unwrap().unwrap();
  assert_eq!(total.status, OrderStatus::Processed);
  assert_eq!(total.total, 3 * 15_000);
  assert_eq!(total.customer_address, "Jl. Merdeka 1, Bandung");
  assert_eq!(total.items.len(), 2);
  assert_eq!(total.items[0].product_name, "Kaos Polos size: S color: Red");
  assert_eq!(total.items[0].subtotal, 30_000);
  assert_eq!(total.items[1].quantity, 1);

  assert!(s.get_order(id + 1).await.unwrap().is_none());
}
