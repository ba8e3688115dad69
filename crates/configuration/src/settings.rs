use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its defaults, so a partial `config.toml`
/// (or none at all) still produces a runnable engine.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub execution: Execution,
    #[serde(default)]
    pub matcher: Matcher,
    #[serde(default)]
    pub retry: Retry,
}

/// Contains the parameters of the fill simulation and the virtual account.
#[derive(Debug, Clone, Deserialize)]
pub struct Execution {
    /// Price degradation applied to market orders against the reference price.
    /// 0.001 corresponds to 0.1%.
    pub slippage_pct: Decimal,

    /// Commission charged on the executed amount of every fill.
    /// 0.001 corresponds to 0.1%.
    pub commission_pct: Decimal,

    /// Number of decimal places execution prices and amounts are rounded to.
    pub price_scale: u32,

    /// The virtual cash balance granted when a user's account is first created.
    pub starting_balance: Decimal,

    /// Maximum quantity a single order can fill in one pass. Zero disables
    /// the cap entirely (every order fills in full).
    pub default_liquidity_threshold: Decimal,

    /// Per-symbol overrides of the liquidity threshold.
    #[serde(default)]
    pub liquidity_thresholds: HashMap<String, Decimal>,
}

impl Execution {
    /// Resolves the liquidity cap for a symbol: the per-symbol override if
    /// present, otherwise the default. A zero threshold means uncapped.
    pub fn liquidity_threshold(&self, symbol: &str) -> Option<Decimal> {
        let threshold = self
            .liquidity_thresholds
            .get(symbol)
            .copied()
            .unwrap_or(self.default_liquidity_threshold);
        if threshold > Decimal::ZERO {
            Some(threshold)
        } else {
            None
        }
    }
}

/// Contains the schedule of the limit-order sweep and its exclusion lease.
#[derive(Debug, Clone, Deserialize)]
pub struct Matcher {
    /// Seconds between sweep ticks.
    pub sweep_interval_secs: u64,

    /// Upper bound on how long one runner may hold the sweep lease. A
    /// crashed runner frees the job for other instances after this long.
    pub lock_max_hold_secs: u64,

    /// Lower bound on the lease lifetime. A fast sweep keeps the lease this
    /// long so a clock-skewed replica cannot start an overlapping run.
    pub lock_min_hold_secs: u64,
}

/// Contains the bounded-retry policy for optimistic-concurrency conflicts.
#[derive(Debug, Clone, Deserialize)]
pub struct Retry {
    /// Total attempts before a version conflict is surfaced to the caller.
    pub max_attempts: u32,

    /// First backoff delay in milliseconds; doubles on each further attempt.
    pub base_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            execution: Execution::default(),
            matcher: Matcher::default(),
            retry: Retry::default(),
        }
    }
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            slippage_pct: dec!(0.001),
            commission_pct: dec!(0.001),
            price_scale: 2,
            starting_balance: dec!(100000),
            default_liquidity_threshold: Decimal::ZERO,
            liquidity_thresholds: HashMap::new(),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 5,
            lock_max_hold_secs: 60,
            lock_min_hold_secs: 2,
        }
    }
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 50,
        }
    }
}
