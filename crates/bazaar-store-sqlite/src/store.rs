//! [`SqliteStore`], the SQLite implementation of [`CommerceStore`].

use std::{path::Path, time::Duration};

use bazaar_core::{
  ErrorKind,
  catalog::{Customer, NewOrder, NewVariant, Product},
  fulfillment,
  order::{OrderAggregate, OrderConfirmation, OrderId, Transition},
  stock::{ProductVariant, SizeColor, StockAdjustment, StockChange, StockDetails, VariantId},
  store::{CommerceStore, StoreError as _},
  view::{OrderPage, OrderTotal, PageRequest},
};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
  Error, Result,
  encode::{
    ADJUSTMENT_COLUMNS, ORDER_COLUMNS, ORDER_TOTAL_COLUMNS, RawAdjustment, RawLine,
    RawOrder, RawOrderTotal, RawVariant, VARIANT_COLUMNS, encode_dt, encode_uuid,
    read_subtotal,
  },
  schema::SCHEMA,
};

/// How long a writer waits for another connection's write lock before giving
/// up with `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Bazaar store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one connection thread, so their operations run one at a time.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Synchronous helpers (run on the connection thread) ─────────────────────

fn query_variant(conn: &Connection, id: VariantId) -> Result<Option<ProductVariant>> {
  let raw = conn
    .query_row(
      &format!("SELECT {VARIANT_COLUMNS} FROM product_variants v WHERE v.variant_id = ?1"),
      rusqlite::params![id],
      |row| RawVariant::from_row_at(row, 0),
    )
    .optional()?;
  raw.map(RawVariant::into_variant).transpose()
}

fn variant_exists(conn: &Connection, id: VariantId) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM product_variants WHERE variant_id = ?1",
        rusqlite::params![id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn insert_variant(conn: &Connection, input: &NewVariant) -> Result<ProductVariant> {
  let product_exists = conn
    .query_row(
      "SELECT 1 FROM products WHERE product_id = ?1",
      rusqlite::params![input.product_id],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);
  if !product_exists {
    return Err(bazaar_core::Error::ProductNotFound(input.product_id).into());
  }

  let now = encode_dt(Utc::now());
  conn.execute(
    "INSERT INTO product_variants (product_id, size, color, stock, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    rusqlite::params![input.product_id, input.size, input.color, input.stock, now],
  )?;
  let id = conn.last_insert_rowid();
  query_variant(conn, id)?.ok_or(Error::Core(bazaar_core::Error::VariantNotFound(id)))
}

/// Load an order, its items and a copy of each item's variant.
fn query_aggregate(conn: &Connection, order_id: OrderId) -> Result<Option<OrderAggregate>> {
  let raw = conn
    .query_row(
      &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1"),
      rusqlite::params![order_id],
      RawOrder::from_row,
    )
    .optional()?;

  let Some(raw) = raw else {
    return Ok(None);
  };
  let order = raw.into_order()?;

  let mut stmt = conn.prepare(&format!(
    "SELECT oi.item_id, oi.quantity, oi.unit_price, {VARIANT_COLUMNS}
     FROM order_items oi
     JOIN product_variants v ON v.variant_id = oi.variant_id
     WHERE oi.order_id = ?1
     ORDER BY oi.item_id"
  ))?;

  let raws = stmt
    .query_map(rusqlite::params![order_id], |row| {
      Ok(RawLine {
        item_id:    row.get(0)?,
        quantity:   row.get(1)?,
        unit_price: row.get(2)?,
        variant:    RawVariant::from_row_at(row, 3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let items = raws
    .into_iter()
    .map(RawLine::into_line)
    .collect::<Result<Vec<_>>>()?;

  Ok(Some(OrderAggregate { order, items }))
}

fn insert_adjustment(conn: &Connection, adj: &StockAdjustment) -> Result<()> {
  conn.execute(
    "INSERT INTO stock_adjustments (adjustment_id, variant_id, reason, delta, order_id, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      encode_uuid(adj.adjustment_id),
      adj.variant_id,
      adj.reason.as_ref(),
      adj.delta,
      adj.order_id,
      encode_dt(adj.recorded_at),
    ],
  )?;
  Ok(())
}

fn insert_order(conn: &mut Connection, input: &NewOrder) -> Result<OrderAggregate> {
  input.validate()?;

  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let customer_exists = tx
    .query_row(
      "SELECT 1 FROM customers WHERE customer_id = ?1",
      rusqlite::params![input.customer_id],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);
  if !customer_exists {
    return Err(bazaar_core::Error::CustomerNotFound(input.customer_id).into());
  }

  let now = encode_dt(Utc::now());
  tx.execute(
    "INSERT INTO orders (customer_id, payment_method, tracking_number, status, created_at, updated_at)
     VALUES (?1, ?2, NULL, 'created', ?3, ?3)",
    rusqlite::params![input.customer_id, input.payment_method, now],
  )?;
  let order_id = tx.last_insert_rowid();

  for item in &input.items {
    let price: i64 = tx
      .query_row(
        "SELECT p.price
         FROM product_variants v
         JOIN products p ON p.product_id = v.product_id
         WHERE v.variant_id = ?1",
        rusqlite::params![item.variant_id],
        |row| row.get(0),
      )
      .optional()?
      .ok_or(bazaar_core::Error::VariantNotFound(item.variant_id))?;

    tx.execute(
      "INSERT INTO order_items (order_id, variant_id, quantity, unit_price)
       VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![order_id, item.variant_id, item.quantity, price],
    )?;
  }

  let aggregate =
    query_aggregate(&tx, order_id)?.ok_or(bazaar_core::Error::OrderNotFound(order_id))?;
  tx.commit()?;
  Ok(aggregate)
}

/// Load, confirm, deduct and persist one order inside a single `IMMEDIATE`
/// transaction. Any early return drops `tx`, which rolls it back.
fn confirm_order(
  conn: &mut Connection,
  order_id: OrderId,
  confirmation: &OrderConfirmation,
  cancel: &CancellationToken,
) -> Result<Transition> {
  if cancel.is_cancelled() {
    return Err(bazaar_core::Error::Cancelled.into());
  }

  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let mut aggregate =
    query_aggregate(&tx, order_id)?.ok_or(bazaar_core::Error::OrderNotFound(order_id))?;
  let loaded_status = aggregate.order.status;

  let plan = fulfillment::plan(&mut aggregate, confirmation)?;
  let order = &aggregate.order;

  // The status guard makes a lost race visible even if two connections ever
  // managed to read the same status.
  let updated = tx.execute(
    "UPDATE orders SET status = ?1, tracking_number = ?2, updated_at = ?3
     WHERE order_id = ?4 AND status = ?5",
    rusqlite::params![
      order.status.as_ref(),
      order.tracking_number,
      encode_dt(order.updated_at),
      order_id,
      loaded_status.as_ref(),
    ],
  )?;
  if updated != 1 {
    return Err(bazaar_core::Error::ConcurrentModification(order_id).into());
  }

  let now = encode_dt(Utc::now());
  for d in &plan.deductions {
    let changed = tx.execute(
      "UPDATE product_variants SET stock = stock - ?1, updated_at = ?2
       WHERE variant_id = ?3 AND stock >= ?1",
      rusqlite::params![d.quantity, now, d.variant_id],
    )?;
    if changed != 1 {
      return Err(bazaar_core::Error::ConcurrentModification(order_id).into());
    }
  }

  for entry in plan.ledger_entries(order_id) {
    insert_adjustment(&tx, &entry)?;
  }

  if cancel.is_cancelled() {
    return Err(bazaar_core::Error::Cancelled.into());
  }
  tx.commit()?;
  Ok(plan.transition)
}

fn set_stock_level(
  conn: &mut Connection,
  variant_id: VariantId,
  new_level: u32,
) -> Result<Option<StockAdjustment>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let current: u32 = tx
    .query_row(
      "SELECT stock FROM product_variants WHERE variant_id = ?1",
      rusqlite::params![variant_id],
      |row| row.get(0),
    )
    .optional()?
    .ok_or(bazaar_core::Error::VariantNotFound(variant_id))?;

  let Some(change) = StockChange::plan(current, new_level) else {
    return Ok(None);
  };
  let adjustment = StockAdjustment::record(variant_id, change, None);

  tx.execute(
    "UPDATE product_variants SET stock = ?1, updated_at = ?2 WHERE variant_id = ?3",
    rusqlite::params![new_level, encode_dt(adjustment.recorded_at), variant_id],
  )?;
  insert_adjustment(&tx, &adjustment)?;
  tx.commit()?;

  Ok(Some(adjustment))
}

fn query_history(conn: &Connection, variant_id: VariantId) -> Result<Vec<RawAdjustment>> {
  if !variant_exists(conn, variant_id)? {
    return Err(bazaar_core::Error::VariantNotFound(variant_id).into());
  }
  let mut stmt = conn.prepare(&format!(
    "SELECT {ADJUSTMENT_COLUMNS} FROM stock_adjustments
     WHERE variant_id = ?1
     ORDER BY rowid"
  ))?;
  let rows = stmt
    .query_map(rusqlite::params![variant_id], RawAdjustment::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn query_order_page(conn: &Connection, request: PageRequest) -> Result<OrderPage> {
  let total: i64 =
    conn.query_row("SELECT COUNT(*) FROM order_totals", [], |row| row.get(0))?;
  let total = u64::try_from(total).unwrap_or(0);

  // `page * limit` can exceed what SQLite's signed OFFSET holds.
  let offset = i64::try_from(request.offset())
    .ok()
    .filter(|&offset| offset.unsigned_abs() < total)
    .ok_or(bazaar_core::Error::PageNotFound(request.page))?;

  let mut stmt = conn.prepare(&format!(
    "SELECT {ORDER_TOTAL_COLUMNS} FROM order_totals ORDER BY order_id LIMIT ?1 OFFSET ?2"
  ))?;
  let orders = stmt
    .query_map(
      rusqlite::params![i64::from(request.limit), offset],
      RawOrderTotal::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .into_iter()
    .map(|raw| raw.into_total(Vec::new()))
    .collect::<Result<Vec<_>>>()?;

  Ok(OrderPage {
    total,
    pages: request.page_count(total),
    page: request.page,
    limit: request.limit,
    orders,
  })
}

fn query_order_total(conn: &Connection, order_id: OrderId) -> Result<Option<OrderTotal>> {
  let raw = conn
    .query_row(
      &format!("SELECT {ORDER_TOTAL_COLUMNS} FROM order_totals WHERE order_id = ?1"),
      rusqlite::params![order_id],
      RawOrderTotal::from_row,
    )
    .optional()?;

  let Some(raw) = raw else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT product_name, quantity, unit_price, subtotal
     FROM order_item_subtotals
     WHERE order_id = ?1
     ORDER BY item_id",
  )?;
  let items = stmt
    .query_map(rusqlite::params![order_id], read_subtotal)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raw.into_total(items).map(Some)
}

// ─── CommerceStore impl ──────────────────────────────────────────────────────

impl CommerceStore for SqliteStore {
  type Error = Error;

  // ── Catalogue setup ───────────────────────────────────────────────────────

  async fn add_customer(&self, name: String, address: String) -> Result<Customer> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO customers (name, address) VALUES (?1, ?2)",
          rusqlite::params![name, address],
        )?;
        Ok(Customer { customer_id: conn.last_insert_rowid(), name, address })
      })
      .await
      .map_err(Error::from)
  }

  async fn add_product(&self, name: String, price: i64) -> Result<Product> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO products (name, price) VALUES (?1, ?2)",
          rusqlite::params![name, price],
        )?;
        Ok(Product { product_id: conn.last_insert_rowid(), name, price })
      })
      .await
      .map_err(Error::from)
  }

  async fn add_variant(&self, input: NewVariant) -> Result<ProductVariant> {
    self.conn.call(move |conn| Ok(insert_variant(conn, &input))).await?
  }

  async fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>> {
    self.conn.call(move |conn| Ok(query_variant(conn, id))).await?
  }

  async fn place_order(&self, input: NewOrder) -> Result<OrderAggregate> {
    let aggregate = self
      .conn
      .call(move |conn| Ok(insert_order(conn, &input)))
      .await??;
    tracing::debug!(
      order_id = aggregate.order.order_id,
      items = aggregate.items.len(),
      "order placed"
    );
    Ok(aggregate)
  }

  // ── Fulfilment ────────────────────────────────────────────────────────────

  async fn load_order(&self, id: OrderId) -> Result<Option<OrderAggregate>> {
    self.conn.call(move |conn| Ok(query_aggregate(conn, id))).await?
  }

  async fn update_order(
    &self,
    id: OrderId,
    confirmation: OrderConfirmation,
    cancel: CancellationToken,
  ) -> Result<Transition> {
    let result = self
      .conn
      .call(move |conn| Ok(confirm_order(conn, id, &confirmation, &cancel)))
      .await
      .map_err(Error::from)
      .and_then(|inner| inner);

    match &result {
      Ok(t) => tracing::info!(order_id = id, from = %t.from, to = %t.to, "order status updated"),
      Err(e) if e.kind() == ErrorKind::Persistence => {
        tracing::error!(order_id = id, error = %e, "failed to persist order update")
      }
      Err(e) => tracing::warn!(order_id = id, error = %e, "order confirmation rejected"),
    }
    result
  }

  // ── Stock ledger ──────────────────────────────────────────────────────────

  async fn adjust_stock(
    &self,
    variant_id: VariantId,
    new_level: u32,
  ) -> Result<Option<StockAdjustment>> {
    let adjustment = self
      .conn
      .call(move |conn| Ok(set_stock_level(conn, variant_id, new_level)))
      .await??;

    match &adjustment {
      Some(a) => tracing::info!(
        variant_id,
        reason = %a.reason,
        delta = a.delta,
        "stock adjusted"
      ),
      None => tracing::debug!(variant_id, new_level, "stock unchanged; nothing recorded"),
    }
    Ok(adjustment)
  }

  async fn stock_details(&self, variant_id: VariantId) -> Result<Option<StockDetails>> {
    let details = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT v.variant_id, p.name, v.size, v.color, v.stock
               FROM product_variants v
               JOIN products p ON p.product_id = v.product_id
               WHERE v.variant_id = ?1",
              rusqlite::params![variant_id],
              |row| {
                Ok(StockDetails {
                  variant_id:    row.get(0)?,
                  product_name:  row.get(1)?,
                  variant:       SizeColor { size: row.get(2)?, color: row.get(3)? },
                  current_stock: row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    Ok(details)
  }

  async fn stock_history(&self, variant_id: VariantId) -> Result<Vec<StockAdjustment>> {
    let raws = self
      .conn
      .call(move |conn| Ok(query_history(conn, variant_id)))
      .await??;

    raws.into_iter().map(RawAdjustment::into_adjustment).collect()
  }

  // ── Order queries ─────────────────────────────────────────────────────────

  async fn list_orders(&self, page: u32, limit: u32) -> Result<OrderPage> {
    let request = PageRequest::new(page, limit)?;
    self.conn.call(move |conn| Ok(query_order_page(conn, request))).await?
  }

  async fn get_order(&self, id: OrderId) -> Result<Option<OrderTotal>> {
    self.conn.call(move |conn| Ok(query_order_total(conn, id))).await?
  }
}
