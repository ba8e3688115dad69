//! # Papertrade Ledger Crate
//!
//! This crate is the storage boundary of the engine. It is deliberately
//! ignorant of business rules: it stores orders and trades, and it guards
//! `Holding`/`Portfolio` rows with optimistic version stamps so concurrent
//! writers detect lost updates instead of causing them.
//!
//! ## Architectural Principles
//!
//! - **Narrow seam:** Everything above this crate talks to the `LedgerStore`
//!   trait. The shipped `InMemoryLedger` is one implementation; a database
//!   row with a version column would be another.
//! - **Compare-and-swap, not locks:** No lock is held across I/O by callers.
//!   Every save of a stamped row is a CAS; conflicts are surfaced as typed
//!   errors and absorbed by the bounded retry helper in `retry`.
//!
//! ## Public API
//!
//! - `LedgerStore`: the async storage trait.
//! - `InMemoryLedger`: the shipped implementation.
//! - `with_conflict_retry`, `RetryPolicy`, `ConflictError`: the bounded
//!   retry-with-backoff wrapper for CAS write units.
//! - `LedgerError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod memory;
pub mod retry;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use retry::{with_conflict_retry, ConflictError, RetryPolicy};
pub use store::LedgerStore;
