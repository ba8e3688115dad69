//! # Papertrade Executor Crate
//!
//! This crate provides the core components for simulated trade execution and
//! account state management: the market-order fill simulator, the shared
//! fill pipeline used by both execution paths, and the accountant that
//! applies fills to holdings and portfolios.
//!
//! ## Architectural Principles
//!
//! - **State vs. logic decoupling:** The accountant functions are pure state
//!   transitions over `Holding` and `Portfolio` snapshots; the `FillEngine`
//!   decides when a transition may run and commits it through the ledger as
//!   one unit. This separation is key for testability and clarity.
//! - **One pipeline, two entry points:** Market orders and matched limit
//!   orders differ only in how their execution price is chosen. Everything
//!   from liquidity capping to the transactional commit is shared.
//!
//! ## Public API
//!
//! - `OrderService`: placement, cancellation, and read-side queries.
//! - `MarketOrderExecutor`: the synchronous fill simulation.
//! - `FillEngine`: the shared fill pipeline (consumed by the sweep).
//! - `TradingGate` / `AllowAllGate`: the subscription seam.
//! - `ExecutorError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod accountant;
pub mod error;
pub mod fill;
pub mod gate;
pub mod market;
pub mod service;
pub mod valuation;

// Re-export the key components to provide a clean, public-facing API.
pub use error::ExecutorError;
pub use fill::FillEngine;
pub use gate::{AllowAllGate, TradingGate};
pub use market::MarketOrderExecutor;
pub use service::OrderService;
pub use valuation::{HoldingValuation, PortfolioValuation};
