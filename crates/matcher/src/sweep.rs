use crate::error::MatcherError;
use core_types::{Order, OrderSide};
use executor::{ExecutorError, FillEngine};
use ledger::{ConflictError, LedgerStore};
use market_data::PriceSource;
use std::sync::Arc;

/// Counters for one sweep pass, reported to the scheduler's log.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepReport {
    pub evaluated: usize,
    pub filled: usize,
    pub rejected: usize,
    pub deferred: usize,
}

enum Outcome {
    Filled,
    NotTriggered,
    Rejected,
    Deferred,
}

/// Evaluates the open limit-order book against current reference prices.
///
/// One sweep walks every pending limit order oldest-first and fills those
/// whose price condition is met, at the order's own limit price. Failures
/// are strictly per-order: a funds shortfall rejects that order, a missing
/// price defers it to the next sweep, and neither stops the walk.
pub struct LimitOrderMatcher {
    ledger: Arc<dyn LedgerStore>,
    prices: Arc<dyn PriceSource>,
    fills: Arc<FillEngine>,
}

impl LimitOrderMatcher {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        prices: Arc<dyn PriceSource>,
        fills: Arc<FillEngine>,
    ) -> Self {
        Self {
            ledger,
            prices,
            fills,
        }
    }

    /// Runs one full sweep over the pending limit orders.
    pub async fn run_sweep(&self) -> Result<SweepReport, MatcherError> {
        let pending = self.ledger.pending_limit_orders().await?;
        let mut report = SweepReport::default();

        for order in pending {
            report.evaluated += 1;
            match self.evaluate_order(&order).await {
                Outcome::Filled => report.filled += 1,
                Outcome::NotTriggered => {}
                Outcome::Rejected => report.rejected += 1,
                Outcome::Deferred => report.deferred += 1,
            }
        }

        if report.filled > 0 || report.rejected > 0 {
            tracing::info!(
                evaluated = report.evaluated,
                filled = report.filled,
                rejected = report.rejected,
                deferred = report.deferred,
                "sweep complete"
            );
        } else {
            tracing::debug!(evaluated = report.evaluated, "sweep complete, no matches");
        }
        Ok(report)
    }

    async fn evaluate_order(&self, order: &Order) -> Outcome {
        let Some(limit_price) = order.limit_price else {
            tracing::warn!(order_id = %order.id, "pending limit order without a price, deferring");
            return Outcome::Deferred;
        };

        // A feed gap is transient: leave the order pending and let the next
        // sweep see it again.
        let current_price = match self.prices.current_price(&order.symbol).await {
            Ok(price) => price,
            Err(_) => {
                tracing::debug!(
                    order_id = %order.id,
                    symbol = %order.symbol,
                    "no reference price, deferring to next sweep"
                );
                return Outcome::Deferred;
            }
        };

        let triggered = match order.side {
            OrderSide::Buy => current_price <= limit_price,
            OrderSide::Sell => current_price >= limit_price,
        };
        if !triggered {
            return Outcome::NotTriggered;
        }

        // The user bounded the price, so the fill executes at the limit
        // price itself, not the reference that crossed it.
        match self.fills.fill_at(order.id, limit_price).await {
            Ok(filled) => {
                tracing::info!(
                    order_id = %filled.id,
                    symbol = %filled.symbol,
                    side = ?filled.side,
                    %limit_price,
                    %current_price,
                    status = ?filled.status,
                    "limit order matched"
                );
                Outcome::Filled
            }
            Err(
                error @ (ExecutorError::InsufficientFunds { .. }
                | ExecutorError::InsufficientHoldings { .. }),
            ) => {
                // Unlikely to self-resolve; terminal-stamp this order and
                // keep sweeping.
                tracing::warn!(order_id = %order.id, %error, "limit order rejected at fill time");
                self.reject_order(order).await;
                Outcome::Rejected
            }
            Err(ExecutorError::OrderNotOpen { id, status }) => {
                tracing::debug!(order_id = %id, ?status, "order closed while matching");
                Outcome::Deferred
            }
            Err(error) if error.is_conflict() => {
                tracing::warn!(
                    order_id = %order.id,
                    "ledger stayed contended, deferring to next sweep"
                );
                Outcome::Deferred
            }
            Err(error) => {
                tracing::error!(order_id = %order.id, %error, "limit order fill failed");
                Outcome::Deferred
            }
        }
    }

    async fn reject_order(&self, order: &Order) {
        let mut order = order.clone();
        if order.reject().is_err() {
            return;
        }
        if let Err(error) = self.ledger.update_order(&order).await {
            tracing::warn!(order_id = %order.id, %error, "failed to stamp rejected order");
        }
    }
}
