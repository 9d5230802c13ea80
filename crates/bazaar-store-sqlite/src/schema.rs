//! SQL schema for the Bazaar SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS customers (
    customer_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    address     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    product_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    price      INTEGER NOT NULL CHECK (price >= 0)   -- minor currency units
);

CREATE TABLE IF NOT EXISTS product_variants (
    variant_id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL REFERENCES products(product_id),
    size       TEXT NOT NULL,
    color      TEXT NOT NULL,
    stock      INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    order_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id     INTEGER NOT NULL REFERENCES customers(customer_id),
    payment_method  TEXT NOT NULL,
    tracking_number TEXT,
    status          TEXT NOT NULL DEFAULT 'created',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    CHECK (status != 'completed'
           OR (tracking_number IS NOT NULL AND length(trim(tracking_number)) > 0))
);

-- unit_price is a snapshot of products.price taken when the order was placed.
CREATE TABLE IF NOT EXISTS order_items (
    item_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id   INTEGER NOT NULL REFERENCES orders(order_id),
    variant_id INTEGER NOT NULL REFERENCES product_variants(variant_id),
    quantity   INTEGER NOT NULL CHECK (quantity > 0),
    unit_price INTEGER NOT NULL
);

-- Stock ledger. Strictly append-only: no UPDATE or DELETE is ever issued.
CREATE TABLE IF NOT EXISTS stock_adjustments (
    adjustment_id TEXT PRIMARY KEY,
    variant_id    INTEGER NOT NULL REFERENCES product_variants(variant_id),
    reason        TEXT NOT NULL,   -- 'manual_addition' | 'manual_reduction' | 'automatic_deduction'
    delta         INTEGER NOT NULL CHECK (delta != 0),
    order_id      INTEGER REFERENCES orders(order_id),
    recorded_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS order_items_order_idx        ON order_items(order_id);
CREATE INDEX IF NOT EXISTS stock_adjustments_variant_idx ON stock_adjustments(variant_id);

CREATE VIEW IF NOT EXISTS order_item_subtotals AS
SELECT oi.order_id,
       oi.item_id,
       p.name || ' size: ' || v.size || ' color: ' || v.color AS product_name,
       oi.quantity,
       oi.unit_price,
       oi.quantity * oi.unit_price AS subtotal
FROM order_items oi
JOIN product_variants v ON v.variant_id = oi.variant_id
JOIN products p         ON p.product_id = v.product_id;

CREATE VIEW IF NOT EXISTS order_totals AS
SELECT o.order_id,
       c.name    AS customer_name,
       c.address AS customer_address,
       o.payment_method,
       t.total,
       o.status
FROM orders o
JOIN (
    SELECT order_id, SUM(quantity * unit_price) AS total
    FROM order_items
    GROUP BY order_id
) t ON t.order_id = o.order_id
JOIN customers c ON c.customer_id = o.customer_id;

PRAGMA user_version = 1;
";
