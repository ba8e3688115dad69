use crate::error::ExecutorError;
use crate::fill::FillEngine;
use crate::gate::TradingGate;
use crate::market::MarketOrderExecutor;
use crate::valuation::{self, PortfolioValuation};
use configuration::Execution;
use core_types::{Order, OrderRequest, OrderSide, OrderType, Portfolio, Trade};
use ledger::{ConflictError, LedgerError, LedgerStore, RetryPolicy};
use market_data::PriceSource;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// The public surface of the trading engine: placement, cancellation, and
/// the read-side queries.
///
/// The service owns validation and account bootstrapping, then hands off to
/// the market executor (synchronous path) or parks the order for the sweep
/// (asynchronous path). Both paths converge on the shared `FillEngine`.
pub struct OrderService {
    ledger: Arc<dyn LedgerStore>,
    prices: Arc<dyn PriceSource>,
    gate: Arc<dyn TradingGate>,
    rules: Execution,
    market: MarketOrderExecutor,
    fills: Arc<FillEngine>,
}

impl OrderService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        prices: Arc<dyn PriceSource>,
        gate: Arc<dyn TradingGate>,
        rules: Execution,
        retry: RetryPolicy,
    ) -> Self {
        let fills = Arc::new(FillEngine::new(
            Arc::clone(&ledger),
            rules.clone(),
            retry,
        ));
        let market = MarketOrderExecutor::new(
            Arc::clone(&prices),
            Arc::clone(&ledger),
            rules.clone(),
            Arc::clone(&fills),
        );
        Self {
            ledger,
            prices,
            gate,
            rules,
            market,
            fills,
        }
    }

    /// The shared fill pipeline, handed to the limit-order sweep.
    pub fn fill_engine(&self) -> Arc<FillEngine> {
        Arc::clone(&self.fills)
    }

    /// Places any order. Market orders execute immediately; limit, stop-loss
    /// and take-profit orders are admitted to the book, though only limit
    /// orders are ever picked up by the sweep.
    pub async fn place_order(&self, request: OrderRequest) -> Result<Order, ExecutorError> {
        if !self.gate.is_trading_enabled(request.user_id).await {
            return Err(ExecutorError::TradingDisabled(request.user_id));
        }
        self.ensure_portfolio(request.user_id).await?;

        match request.order_type {
            OrderType::Market => self.market.execute(request).await,
            OrderType::Limit | OrderType::StopLoss | OrderType::TakeProfit => {
                self.admit_resting_order(request).await
            }
        }
    }

    pub async fn place_market_order(
        &self,
        user_id: Uuid,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<Order, ExecutorError> {
        self.place_order(OrderRequest {
            user_id,
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
        })
        .await
    }

    pub async fn place_limit_order(
        &self,
        user_id: Uuid,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> Result<Order, ExecutorError> {
        self.place_order(OrderRequest {
            user_id,
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            quantity,
            limit_price: Some(limit_price),
        })
        .await
    }

    /// Cancels an order the user still has pending.
    ///
    /// Cancellation is cooperative: a fill that wins the race leaves the
    /// order in its filled state and the cancel reports that status instead
    /// of pretending to succeed.
    pub async fn cancel_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, ExecutorError> {
        let mut order = self.load_user_order(user_id, order_id).await?;
        let status = order.status;
        order
            .cancel()
            .map_err(|_| ExecutorError::OrderNotCancellable {
                id: order_id,
                status,
            })?;

        match self.ledger.update_order(&order).await {
            Ok(()) => {
                tracing::info!(%order_id, "order cancelled");
                Ok(order)
            }
            Err(LedgerError::VersionConflict { .. }) => {
                let current = self.ledger.get_order(order_id).await?;
                Err(ExecutorError::OrderNotCancellable {
                    id: order_id,
                    status: current.status,
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, ExecutorError> {
        self.load_user_order(user_id, order_id).await
    }

    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<Order>, ExecutorError> {
        Ok(self.ledger.orders_for_user(user_id).await?)
    }

    pub async fn list_open_orders(&self, user_id: Uuid) -> Result<Vec<Order>, ExecutorError> {
        Ok(self.ledger.open_orders_for_user(user_id).await?)
    }

    pub async fn trades_for_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<Trade>, ExecutorError> {
        self.load_user_order(user_id, order_id).await?;
        Ok(self.ledger.trades_for_order(order_id).await?)
    }

    /// The derived account view, marked to current reference prices.
    pub async fn portfolio_snapshot(
        &self,
        user_id: Uuid,
    ) -> Result<PortfolioValuation, ExecutorError> {
        valuation::snapshot(self.ledger.as_ref(), self.prices.as_ref(), user_id).await
    }

    /// Fetches the user's portfolio, opening the account with the configured
    /// starting balance on first touch. Two racing first placements are
    /// resolved by the version stamp: the loser re-reads the winner's row.
    async fn ensure_portfolio(&self, user_id: Uuid) -> Result<Portfolio, ExecutorError> {
        if let Some(portfolio) = self.ledger.get_portfolio(user_id).await? {
            return Ok(portfolio);
        }
        let fresh = Portfolio::new(user_id, self.rules.starting_balance);
        match self.ledger.save_portfolio(&fresh).await {
            Ok(stored) => {
                tracing::info!(
                    %user_id,
                    starting_balance = %self.rules.starting_balance,
                    "account opened"
                );
                Ok(stored)
            }
            Err(error) if error.is_conflict() => self
                .ledger
                .get_portfolio(user_id)
                .await?
                .ok_or(ExecutorError::PortfolioNotFound(user_id)),
            Err(error) => Err(error.into()),
        }
    }

    async fn admit_resting_order(&self, request: OrderRequest) -> Result<Order, ExecutorError> {
        let order = Order::new(request)?;
        self.ledger.insert_order(&order).await?;
        tracing::info!(
            order_id = %order.id,
            order_type = ?order.order_type,
            symbol = %order.symbol,
            limit_price = ?order.limit_price,
            "resting order admitted"
        );
        Ok(order)
    }

    async fn load_user_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<Order, ExecutorError> {
        let order = match self.ledger.get_order(order_id).await {
            Ok(order) => order,
            Err(LedgerError::NotFound { .. }) => {
                return Err(ExecutorError::OrderNotFound(order_id));
            }
            Err(error) => return Err(error.into()),
        };
        // An order belonging to someone else is indistinguishable from a
        // missing one.
        if order.user_id != user_id {
            return Err(ExecutorError::OrderNotFound(order_id));
        }
        Ok(order)
    }
}
