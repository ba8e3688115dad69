use crate::error::MarketDataError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The generic, abstract interface for a reference-price lookup.
///
/// This trait is the contract the executors use, allowing the underlying
/// implementation (an in-memory cache, a feed-backed store, a mock) to be
/// swapped out. A missing symbol is an expected condition, not a fault:
/// callers decide whether it fails a request or defers it.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Returns the current reference price for `symbol`.
    async fn current_price(&self, symbol: &str) -> Result<Decimal, MarketDataError>;
}

/// One cached quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// A concurrent in-memory price cache.
///
/// Writers (a feed ingester, test fixtures, the demo CLI) push prices in;
/// readers see the latest value per symbol without any global lock.
#[derive(Debug, Default)]
pub struct InMemoryPriceFeed {
    prices: DashMap<String, PricePoint>,
}

impl InMemoryPriceFeed {
    pub fn new() -> Self {
        Self {
            prices: DashMap::new(),
        }
    }

    /// Inserts or replaces the reference price for a symbol.
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        tracing::debug!(symbol, %price, "reference price updated");
        self.prices.insert(
            symbol.to_string(),
            PricePoint {
                price,
                updated_at: Utc::now(),
            },
        );
    }

    /// Bulk-loads a set of quotes, replacing any existing entries.
    pub fn load<I>(&self, quotes: I)
    where
        I: IntoIterator<Item = (String, Decimal)>,
    {
        for (symbol, price) in quotes {
            self.set_price(&symbol, price);
        }
    }

    /// Drops the cached price for a symbol, simulating a feed gap.
    pub fn remove(&self, symbol: &str) {
        self.prices.remove(symbol);
    }

    /// The number of symbols currently quoted.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[async_trait]
impl PriceSource for InMemoryPriceFeed {
    async fn current_price(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        self.prices
            .get(symbol)
            .map(|point| point.price)
            .ok_or_else(|| MarketDataError::PriceUnavailable(symbol.to_string()))
    }
}
