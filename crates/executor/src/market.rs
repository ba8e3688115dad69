use crate::error::ExecutorError;
use crate::fill::{round_money, FillEngine};
use configuration::Execution;
use core_types::{Order, OrderRequest, OrderSide, OrderType};
use ledger::{ConflictError, LedgerStore};
use market_data::PriceSource;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Applies the configured slippage against the reference price.
///
/// Slippage always moves the price against the taker: a buy fills above the
/// quote, a sell below it.
fn slippage_price(side: OrderSide, reference: Decimal, slippage_pct: Decimal) -> Decimal {
    match side {
        OrderSide::Buy => reference * (Decimal::ONE + slippage_pct),
        OrderSide::Sell => reference * (Decimal::ONE - slippage_pct),
    }
}

/// The synchronous execution path: a market order is priced, admitted, and
/// filled within the caller's request.
///
/// The executor itself only decides the execution price; quantity capping,
/// funds validation and the ledger commit are the `FillEngine`'s job, shared
/// with the limit-order sweep.
pub struct MarketOrderExecutor {
    prices: Arc<dyn PriceSource>,
    ledger: Arc<dyn LedgerStore>,
    rules: Execution,
    fills: Arc<FillEngine>,
}

impl MarketOrderExecutor {
    pub fn new(
        prices: Arc<dyn PriceSource>,
        ledger: Arc<dyn LedgerStore>,
        rules: Execution,
        fills: Arc<FillEngine>,
    ) -> Self {
        Self {
            prices,
            ledger,
            rules,
            fills,
        }
    }

    /// Simulates the immediate execution of a market order.
    pub async fn execute(&self, request: OrderRequest) -> Result<Order, ExecutorError> {
        if request.order_type != OrderType::Market {
            return Err(ExecutorError::UnsupportedOrderType(request.order_type));
        }
        let order = Order::new(request)?;

        // A missing reference price fails the request before anything lands
        // in the ledger.
        let reference_price = self.prices.current_price(&order.symbol).await?;
        let execution_price = round_money(
            slippage_price(order.side, reference_price, self.rules.slippage_pct),
            self.rules.price_scale,
        );
        tracing::debug!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = ?order.side,
            %reference_price,
            %execution_price,
            "market order priced"
        );

        self.ledger.insert_order(&order).await?;
        match self.fills.fill_at(order.id, execution_price).await {
            Ok(filled) => Ok(filled),
            Err(error) => {
                // The fill never landed. Market orders are not requeued, so
                // the admitted row is terminal-stamped rather than left open.
                self.mark_rejected(order.id).await;
                if error.is_conflict() {
                    Err(ExecutorError::ConcurrencyConflict)
                } else {
                    Err(error)
                }
            }
        }
    }

    async fn mark_rejected(&self, order_id: Uuid) {
        match self.ledger.get_order(order_id).await {
            Ok(mut order) if order.status.is_open() => {
                if order.reject().is_ok() {
                    if let Err(error) = self.ledger.update_order(&order).await {
                        tracing::warn!(%order_id, %error, "failed to stamp rejected order");
                    }
                }
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(%order_id, %error, "failed to re-read order for rejection");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn buys_fill_above_the_reference_and_sells_below() {
        let reference = dec!(50000);
        let slippage = dec!(0.001);

        let buy = slippage_price(OrderSide::Buy, reference, slippage);
        let sell = slippage_price(OrderSide::Sell, reference, slippage);

        assert_eq!(buy, dec!(50050.000));
        assert_eq!(sell, dec!(49950.000));
        assert!(buy >= reference);
        assert!(sell <= reference);
    }

    #[test]
    fn zero_slippage_fills_at_the_reference() {
        let reference = dec!(3000);
        assert_eq!(
            slippage_price(OrderSide::Buy, reference, Decimal::ZERO),
            reference
        );
        assert_eq!(
            slippage_price(OrderSide::Sell, reference, Decimal::ZERO),
            reference
        );
    }

    #[test]
    fn prices_round_half_up_at_the_configured_scale() {
        assert_eq!(round_money(dec!(50050.005), 2), dec!(50050.01));
        assert_eq!(round_money(dec!(49.994), 2), dec!(49.99));
        assert_eq!(round_money(dec!(100), 2), dec!(100));
    }
}
