//! The `CommerceStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `bazaar-store-sqlite`).
//! The REST layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::{
  ErrorKind,
  catalog::{Customer, NewOrder, NewVariant, Product},
  order::{OrderAggregate, OrderConfirmation, OrderId, Transition},
  stock::{ProductVariant, StockAdjustment, StockDetails, VariantId},
  view::{OrderPage, OrderTotal},
};

/// Errors raised by a backend must say which [`ErrorKind`] they belong to so
/// transports can report them without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> ErrorKind;
}

/// Abstraction over a Bazaar storage backend.
///
/// Every write is a single atomic unit: either all of its rows are visible
/// afterwards or none are. Writes that touch the same order or variant are
/// serialised by the backend.
pub trait CommerceStore: Send + Sync {
  type Error: StoreError;

  // ── Catalogue setup ───────────────────────────────────────────────────

  fn add_customer(
    &self,
    name: String,
    address: String,
  ) -> impl Future<Output = Result<Customer, Self::Error>> + Send + '_;

  fn add_product(
    &self,
    name: String,
    price: i64,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  /// Fails with `ProductNotFound` for an unknown product.
  fn add_variant(
    &self,
    input: NewVariant,
  ) -> impl Future<Output = Result<ProductVariant, Self::Error>> + Send + '_;

  fn get_variant(
    &self,
    id: VariantId,
  ) -> impl Future<Output = Result<Option<ProductVariant>, Self::Error>> + Send + '_;

  /// Place an order in status `created`, snapshotting each product's price
  /// onto its items. Stock is not touched until the order is accepted.
  fn place_order(
    &self,
    input: NewOrder,
  ) -> impl Future<Output = Result<OrderAggregate, Self::Error>> + Send + '_;

  // ── Fulfilment ────────────────────────────────────────────────────────

  /// Load an order with its items and a copy of each item's variant.
  fn load_order(
    &self,
    id: OrderId,
  ) -> impl Future<Output = Result<Option<OrderAggregate>, Self::Error>> + Send + '_;

  /// Apply `confirmation` to an order and, on `created → processed`, deduct
  /// every item from stock; all inside one transaction.
  ///
  /// If `cancel` fires before the commit the transaction is rolled back and
  /// the call fails with `Cancelled`; nothing is written.
  fn update_order(
    &self,
    id: OrderId,
    confirmation: OrderConfirmation,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<Transition, Self::Error>> + Send + '_;

  // ── Stock ledger ──────────────────────────────────────────────────────

  /// Set a variant's stock to `new_level` and record the difference in the
  /// ledger. Returns `None`, writing nothing, when the level is unchanged.
  fn adjust_stock(
    &self,
    variant_id: VariantId,
    new_level: u32,
  ) -> impl Future<Output = Result<Option<StockAdjustment>, Self::Error>> + Send + '_;

  fn stock_details(
    &self,
    variant_id: VariantId,
  ) -> impl Future<Output = Result<Option<StockDetails>, Self::Error>> + Send + '_;

  /// Ledger rows for a variant, oldest first.
  fn stock_history(
    &self,
    variant_id: VariantId,
  ) -> impl Future<Output = Result<Vec<StockAdjustment>, Self::Error>> + Send + '_;

  // ── Order queries ─────────────────────────────────────────────────────

  /// A page of the order-total view. Fails with `InvalidPage` for a zero page
  /// or limit and `PageNotFound` when the page holds no rows.
  fn list_orders(
    &self,
    page: u32,
    limit: u32,
  ) -> impl Future<Output = Result<OrderPage, Self::Error>> + Send + '_;

  fn get_order(
    &self,
    id: OrderId,
  ) -> impl Future<Output = Result<Option<OrderTotal>, Self::Error>> + Send + '_;
}

impl StoreError for crate::Error {
  fn kind(&self) -> ErrorKind { crate::Error::kind(self) }
}
