//! # Papertrade Core Types
//!
//! This crate defines the shared domain model for the simulated trading
//! engine: the order state machine, the immutable trade record, and the two
//! derived ledger aggregates (`Holding` and `Portfolio`).
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** This crate depends on nothing else in the workspace and
//!   provides the definitive vocabulary for every other crate.
//! - **State machine over counters:** `Order` owns its legal transitions.
//!   All fill and cancellation mutations go through methods that enforce the
//!   fill-relation invariant, so business rules are never re-derived from
//!   raw field updates elsewhere.
//!
//! ## Public API
//!
//! - `OrderSide`, `OrderType`, `OrderStatus`: the core enums.
//! - `Order`, `Trade`, `Holding`, `Portfolio`: the ledger records.
//! - `OrderRequest`, `Fill`: the inputs to order creation and execution.
//! - `CoreError`: the specific error types that can be returned from this crate.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{OrderSide, OrderStatus, OrderType};
pub use error::CoreError;
pub use structs::{Fill, Holding, Order, OrderRequest, Portfolio, Trade};
