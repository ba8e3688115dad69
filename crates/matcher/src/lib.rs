//! # Papertrade Matcher Crate
//!
//! This crate owns the asynchronous execution path: the periodic sweep that
//! evaluates resting limit orders against current reference prices, and the
//! time-bounded lease that keeps the sweep single-runner across instances.
//!
//! ## Architectural Principles
//!
//! - **One runner, system-wide:** The scheduler only sweeps while holding a
//!   named lease with minimum and maximum hold bounds, so replicas never
//!   evaluate the book concurrently and a crashed runner frees the job on
//!   its own.
//! - **Per-order failure isolation:** A sweep never dies on one bad order.
//!   Transient conditions defer the order to the next sweep; permanent ones
//!   terminal-stamp it and the walk continues.
//!
//! ## Public API
//!
//! - `LimitOrderMatcher`: one sweep pass over the pending book.
//! - `MatcherScheduler`: the periodic loop under the lease.
//! - `SweepLock` / `InMemorySweepLock`: the mutual-exclusion seam.
//! - `MatcherError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod lease;
pub mod scheduler;
pub mod sweep;

// Re-export the key components to provide a clean, public-facing API.
pub use error::MatcherError;
pub use lease::{InMemorySweepLock, Lease, SweepLock};
pub use scheduler::MatcherScheduler;
pub use sweep::{LimitOrderMatcher, SweepReport};
