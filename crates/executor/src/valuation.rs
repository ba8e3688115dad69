use crate::error::ExecutorError;
use chrono::{DateTime, Utc};
use ledger::LedgerStore;
use market_data::PriceSource;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// One holding marked to the current reference price.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingValuation {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub total_cost: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
}

/// A user's account marked to the current reference prices.
///
/// This is a read-side projection: nothing here is stored, and the write
/// path never depends on it.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioValuation {
    pub user_id: Uuid,
    pub virtual_balance: Decimal,
    pub total_invested: Decimal,
    pub market_value: Decimal,
    pub total_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub pnl_pct: Option<Decimal>,
    pub holdings: Vec<HoldingValuation>,
    pub as_of: DateTime<Utc>,
}

/// Recomputes the derived account view from current reference prices.
///
/// A symbol with no current price falls back to its cost basis rather than
/// failing the whole snapshot; a stale quote is a display concern, not a
/// ledger one.
pub async fn snapshot(
    ledger: &dyn LedgerStore,
    prices: &dyn PriceSource,
    user_id: Uuid,
) -> Result<PortfolioValuation, ExecutorError> {
    let portfolio = ledger
        .get_portfolio(user_id)
        .await?
        .ok_or(ExecutorError::PortfolioNotFound(user_id))?;

    let mut rows = Vec::new();
    let mut market_value = Decimal::ZERO;
    let mut unrealized_pnl = Decimal::ZERO;

    for holding in ledger.holdings_for_user(user_id).await? {
        let value = match prices.current_price(&holding.symbol).await {
            Ok(price) => price * holding.quantity,
            Err(_) => {
                tracing::debug!(
                    symbol = %holding.symbol,
                    "no reference price for valuation, using cost basis"
                );
                holding.total_cost
            }
        };
        let pnl = value - holding.total_cost;
        market_value += value;
        unrealized_pnl += pnl;
        rows.push(HoldingValuation {
            symbol: holding.symbol.clone(),
            quantity: holding.quantity,
            average_cost: if holding.quantity.is_zero() {
                Decimal::ZERO
            } else {
                holding.average_cost
            },
            total_cost: holding.total_cost,
            market_value: value,
            unrealized_pnl: pnl,
        });
    }

    let pnl_pct = if portfolio.total_invested > Decimal::ZERO {
        Some(unrealized_pnl / portfolio.total_invested * Decimal::ONE_HUNDRED)
    } else {
        None
    };

    Ok(PortfolioValuation {
        user_id,
        virtual_balance: portfolio.virtual_balance,
        total_invested: portfolio.total_invested,
        market_value,
        total_value: portfolio.virtual_balance + market_value,
        unrealized_pnl,
        pnl_pct,
        holdings: rows,
        as_of: Utc::now(),
    })
}
