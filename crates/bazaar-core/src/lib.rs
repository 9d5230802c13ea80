//! Core types and trait definitions for the Bazaar order backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! It owns the order state machine, the stock ledger rules and the fulfilment
//! planner; storage backends and the REST layer depend on it.

pub mod catalog;
pub mod error;
pub mod fulfillment;
pub mod order;
pub mod stock;
pub mod store;
pub mod view;

pub use error::{Error, ErrorKind, Result};
