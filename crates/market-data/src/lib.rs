//! # Papertrade Market Data
//!
//! This crate owns the reference-price boundary. The engine never talks to
//! an exchange; it reads whatever price the cache currently holds for a
//! symbol and treats a missing entry as a transient gap.
//!
//! ## Public API
//!
//! - `PriceSource`: the async lookup trait consumed by the executors.
//! - `InMemoryPriceFeed`: the shipped concurrent cache implementation.
//! - `MarketDataError`: the specific error types that can be returned from this crate.

pub mod error;
pub mod feed;

// Re-export the key components to provide a clean, public-facing API.
pub use error::MarketDataError;
pub use feed::{InMemoryPriceFeed, PricePoint, PriceSource};
