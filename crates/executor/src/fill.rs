use crate::accountant;
use crate::error::ExecutorError;
use configuration::Execution;
use core_types::{Fill, Order, OrderSide, Trade};
use ledger::{with_conflict_retry, LedgerStore, RetryPolicy};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use uuid::Uuid;

/// Rounds a money amount half-up to the configured number of decimal places.
pub(crate) fn round_money(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// The shared fill pipeline beneath both execution paths.
///
/// Given an admitted order and the price it should execute at, the engine
/// caps the quantity by the symbol's liquidity threshold, validates funds or
/// holdings, applies the accounting, and commits the whole unit through the
/// ledger. Every attempt is a complete read-validate-write cycle run under
/// the bounded conflict-retry helper, so a racing writer costs a retry, not
/// a lost update.
pub struct FillEngine {
    ledger: Arc<dyn LedgerStore>,
    rules: Execution,
    retry: RetryPolicy,
}

impl FillEngine {
    pub fn new(ledger: Arc<dyn LedgerStore>, rules: Execution, retry: RetryPolicy) -> Self {
        Self {
            ledger,
            rules,
            retry,
        }
    }

    /// Executes one fill of `order_id` at `execution_price`.
    ///
    /// The caller decides the price: the market executor passes the
    /// slippage-adjusted reference price, the limit matcher passes the
    /// order's own limit price.
    pub async fn fill_at(
        &self,
        order_id: Uuid,
        execution_price: Decimal,
    ) -> Result<Order, ExecutorError> {
        with_conflict_retry(&self.retry, || self.attempt_fill(order_id, execution_price)).await
    }

    /// The quantity this pass may fill: the order's remainder, capped by the
    /// symbol's liquidity threshold when one is configured.
    fn fillable_quantity(&self, order: &Order) -> Decimal {
        let remaining = order.remaining_quantity();
        match self.rules.liquidity_threshold(&order.symbol) {
            Some(threshold) => remaining.min(threshold),
            None => remaining,
        }
    }

    async fn attempt_fill(
        &self,
        order_id: Uuid,
        execution_price: Decimal,
    ) -> Result<Order, ExecutorError> {
        // Re-read on every attempt: a lost race must be observed, not replayed.
        let mut order = self.ledger.get_order(order_id).await?;
        if !order.status.is_open() {
            return Err(ExecutorError::OrderNotOpen {
                id: order_id,
                status: order.status,
            });
        }

        let quantity = self.fillable_quantity(&order);
        let total_amount = round_money(execution_price * quantity, self.rules.price_scale);
        let commission = round_money(
            total_amount * self.rules.commission_pct,
            self.rules.price_scale,
        );
        let fill = Fill {
            quantity,
            price: execution_price,
            total_amount,
            commission,
        };

        let portfolio = self
            .ledger
            .get_portfolio(order.user_id)
            .await?
            .ok_or(ExecutorError::PortfolioNotFound(order.user_id))?;

        let (holding, portfolio, realized_pnl) = match order.side {
            OrderSide::Buy => {
                let required = total_amount + commission;
                if portfolio.virtual_balance < required {
                    return Err(ExecutorError::InsufficientFunds {
                        required,
                        available: portfolio.virtual_balance,
                    });
                }
                let holding = self.ledger.get_holding(order.user_id, &order.symbol).await?;
                let (holding, portfolio) =
                    accountant::apply_buy(holding, portfolio, order.user_id, &order.symbol, &fill)?;
                (holding, portfolio, None)
            }
            OrderSide::Sell => {
                let holding = self.ledger.get_holding(order.user_id, &order.symbol).await?;
                let available = holding
                    .as_ref()
                    .map(|h| h.quantity)
                    .unwrap_or(Decimal::ZERO);
                if available < quantity {
                    return Err(ExecutorError::InsufficientHoldings {
                        requested: quantity,
                        available,
                    });
                }
                let holding = holding.ok_or(ExecutorError::InsufficientHoldings {
                    requested: quantity,
                    available: Decimal::ZERO,
                })?;
                let (holding, portfolio, realized) =
                    accountant::apply_sell(holding, portfolio, &fill)?;
                (holding, portfolio, Some(realized))
            }
        };

        order.record_fill(&fill)?;
        let trade = Trade::from_fill(&order, &fill, realized_pnl);
        self.ledger
            .commit_fill(&order, &trade, &holding, &portfolio)
            .await?;

        tracing::info!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = ?order.side,
            %quantity,
            price = %execution_price,
            status = ?order.status,
            "fill committed"
        );
        Ok(order)
    }
}
