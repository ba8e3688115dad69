use crate::error::LedgerError;
use crate::store::LedgerStore;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Holding, Order, Portfolio, Trade};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// The in-memory ledger tables. One lock guards all of them, which is what
/// gives `commit_fill` its all-or-nothing behavior.
#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<Uuid, Order>,
    trades: Vec<Trade>,
    holdings: HashMap<(Uuid, String), Holding>,
    portfolios: HashMap<Uuid, Portfolio>,
}

/// An in-memory `LedgerStore`.
///
/// Rows are stored by value and cloned out, so callers always work on
/// snapshots; the version stamps are what detect a snapshot gone stale.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    tables: RwLock<Tables>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Verifies the compare-and-swap precondition for a holding row without
/// touching storage.
fn check_holding_stamp(tables: &Tables, row: &Holding) -> Result<(), LedgerError> {
    let key = (row.user_id, row.symbol.clone());
    match tables.holdings.get(&key) {
        None if row.version == 0 => Ok(()),
        None => Err(LedgerError::not_found("holding", format_key(&key))),
        Some(existing) if existing.version == row.version => Ok(()),
        Some(_) => Err(LedgerError::conflict("holding", format_key(&key))),
    }
}

/// Verifies the compare-and-swap precondition for a portfolio row.
fn check_portfolio_stamp(tables: &Tables, row: &Portfolio) -> Result<(), LedgerError> {
    match tables.portfolios.get(&row.user_id) {
        None if row.version == 0 => Ok(()),
        None => Err(LedgerError::not_found("portfolio", row.user_id)),
        Some(existing) if existing.version == row.version => Ok(()),
        Some(_) => Err(LedgerError::conflict("portfolio", row.user_id)),
    }
}

/// Stores a holding row whose stamp has already been checked, bumping the
/// version and returning the row as stored.
fn store_holding(tables: &mut Tables, row: &Holding) -> Holding {
    let mut stored = row.clone();
    stored.version += 1;
    stored.updated_at = Utc::now();
    tables
        .holdings
        .insert((stored.user_id, stored.symbol.clone()), stored.clone());
    stored
}

fn store_portfolio(tables: &mut Tables, row: &Portfolio) -> Portfolio {
    let mut stored = row.clone();
    stored.version += 1;
    stored.updated_at = Utc::now();
    tables.portfolios.insert(stored.user_id, stored.clone());
    stored
}

fn format_key(key: &(Uuid, String)) -> String {
    format!("{}/{}", key.0, key.1)
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn insert_order(&self, order: &Order) -> Result<(), LedgerError> {
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.id) {
            return Err(LedgerError::AlreadyExists {
                entity: "order",
                key: order.id.to_string(),
            });
        }
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_order(&self, order: &Order) -> Result<(), LedgerError> {
        let mut tables = self.tables.write().await;
        match tables.orders.get(&order.id) {
            None => return Err(LedgerError::not_found("order", order.id)),
            // A terminal row is never overwritten, and a row whose fill
            // progress moved since the caller read it has been raced by a
            // concurrent fill commit.
            Some(stored)
                if stored.status.is_terminal()
                    || stored.filled_quantity != order.filled_quantity =>
            {
                return Err(LedgerError::conflict("order", order.id));
            }
            Some(_) => {}
        }
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Order, LedgerError> {
        let tables = self.tables.read().await;
        tables
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("order", order_id))
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, LedgerError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn open_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, LedgerError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| order.user_id == user_id && order.status.is_open())
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn pending_limit_orders(&self) -> Result<Vec<Order>, LedgerError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| {
                order.status == core_types::OrderStatus::Pending
                    && order.order_type == core_types::OrderType::Limit
            })
            .cloned()
            .collect();
        // Oldest first: earlier orders get first claim on constrained fills.
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders)
    }

    async fn insert_trade(&self, trade: &Trade) -> Result<(), LedgerError> {
        let mut tables = self.tables.write().await;
        tables.trades.push(trade.clone());
        Ok(())
    }

    async fn trades_for_order(&self, order_id: Uuid) -> Result<Vec<Trade>, LedgerError> {
        let tables = self.tables.read().await;
        let mut trades: Vec<Trade> = tables
            .trades
            .iter()
            .filter(|trade| trade.order_id == order_id)
            .cloned()
            .collect();
        trades.sort_by(|a, b| a.executed_at.cmp(&b.executed_at));
        Ok(trades)
    }

    async fn get_holding(
        &self,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Holding>, LedgerError> {
        let tables = self.tables.read().await;
        Ok(tables.holdings.get(&(user_id, symbol.to_string())).cloned())
    }

    async fn holdings_for_user(&self, user_id: Uuid) -> Result<Vec<Holding>, LedgerError> {
        let tables = self.tables.read().await;
        let mut holdings: Vec<Holding> = tables
            .holdings
            .values()
            .filter(|holding| holding.user_id == user_id)
            .cloned()
            .collect();
        holdings.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(holdings)
    }

    async fn save_holding(&self, holding: &Holding) -> Result<Holding, LedgerError> {
        let mut tables = self.tables.write().await;
        check_holding_stamp(&tables, holding)?;
        Ok(store_holding(&mut tables, holding))
    }

    async fn get_portfolio(&self, user_id: Uuid) -> Result<Option<Portfolio>, LedgerError> {
        let tables = self.tables.read().await;
        Ok(tables.portfolios.get(&user_id).cloned())
    }

    async fn save_portfolio(&self, portfolio: &Portfolio) -> Result<Portfolio, LedgerError> {
        let mut tables = self.tables.write().await;
        check_portfolio_stamp(&tables, portfolio)?;
        Ok(store_portfolio(&mut tables, portfolio))
    }

    async fn commit_fill(
        &self,
        order: &Order,
        trade: &Trade,
        holding: &Holding,
        portfolio: &Portfolio,
    ) -> Result<(), LedgerError> {
        let mut tables = self.tables.write().await;

        // Every precondition first; nothing is written until all pass.
        match tables.orders.get(&order.id) {
            None => return Err(LedgerError::not_found("order", order.id)),
            // A cancel that won the race leaves a terminal row behind; the
            // fill attempt must re-read rather than overwrite it.
            Some(stored) if !stored.status.is_open() => {
                return Err(LedgerError::conflict("order", order.id));
            }
            Some(_) => {}
        }
        check_holding_stamp(&tables, holding)?;
        check_portfolio_stamp(&tables, portfolio)?;

        tables.orders.insert(order.id, order.clone());
        tables.trades.push(trade.clone());
        store_holding(&mut tables, holding);
        store_portfolio(&mut tables, portfolio);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use core_types::{Fill, OrderRequest, OrderSide, OrderStatus, OrderType};
    use rust_decimal_macros::dec;

    fn limit_order(user_id: Uuid, limit_price: rust_decimal::Decimal) -> Order {
        Order::new(OrderRequest {
            user_id,
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: dec!(1),
            limit_price: Some(limit_price),
        })
        .unwrap()
    }

    fn market_order(user_id: Uuid) -> Order {
        Order::new(OrderRequest {
            user_id,
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: dec!(1),
            limit_price: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn stale_holding_stamp_is_a_conflict() {
        let ledger = InMemoryLedger::new();
        let user_id = Uuid::new_v4();

        let fresh = Holding::open(user_id, "BTCUSDT", dec!(1), dec!(50000));
        let stored = ledger.save_holding(&fresh).await.unwrap();
        assert_eq!(stored.version, 1);

        // A second writer still holding the version-0 snapshot loses.
        let result = ledger.save_holding(&fresh).await;
        assert!(matches!(result, Err(LedgerError::VersionConflict { .. })));

        // The winner's snapshot saves cleanly and bumps again.
        let stored = ledger.save_holding(&stored).await.unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn pending_limit_orders_come_back_oldest_first() {
        let ledger = InMemoryLedger::new();
        let user_id = Uuid::new_v4();

        let mut first = limit_order(user_id, dec!(49000));
        first.created_at = Utc::now() - Duration::seconds(30);
        let second = limit_order(user_id, dec!(48000));
        let mut market = market_order(user_id);
        market.created_at = Utc::now() - Duration::seconds(60);

        ledger.insert_order(&second).await.unwrap();
        ledger.insert_order(&first).await.unwrap();
        ledger.insert_order(&market).await.unwrap();

        let pending = ledger.pending_limit_orders().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
    }

    #[tokio::test]
    async fn commit_fill_is_all_or_nothing() {
        let ledger = InMemoryLedger::new();
        let user_id = Uuid::new_v4();

        let mut order = market_order(user_id);
        ledger.insert_order(&order).await.unwrap();
        let portfolio = ledger
            .save_portfolio(&Portfolio::new(user_id, dec!(100000)))
            .await
            .unwrap();

        let fill = Fill {
            quantity: dec!(1),
            price: dec!(50000),
            total_amount: dec!(50000),
            commission: dec!(50),
        };
        order.record_fill(&fill).unwrap();
        let trade = Trade::from_fill(&order, &fill, None);
        let holding = Holding::open(user_id, "BTCUSDT", dec!(1), dec!(50000));

        // A stale portfolio stamp fails the whole unit.
        let mut stale_portfolio = portfolio.clone();
        stale_portfolio.version = 0;
        let result = ledger
            .commit_fill(&order, &trade, &holding, &stale_portfolio)
            .await;
        assert!(matches!(result, Err(LedgerError::VersionConflict { .. })));

        // Nothing landed: no trade, no holding, order still pending.
        assert!(ledger.trades_for_order(order.id).await.unwrap().is_empty());
        assert!(ledger
            .get_holding(user_id, "BTCUSDT")
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            ledger.get_order(order.id).await.unwrap().status,
            OrderStatus::Pending
        );

        // With matching stamps the unit lands together.
        ledger
            .commit_fill(&order, &trade, &holding, &portfolio)
            .await
            .unwrap();
        assert_eq!(ledger.trades_for_order(order.id).await.unwrap().len(), 1);
        assert_eq!(
            ledger.get_order(order.id).await.unwrap().status,
            OrderStatus::Filled
        );
    }

    #[tokio::test]
    async fn commit_fill_refuses_an_order_cancelled_in_flight() {
        let ledger = InMemoryLedger::new();
        let user_id = Uuid::new_v4();

        let mut order = limit_order(user_id, dec!(49000));
        ledger.insert_order(&order).await.unwrap();
        let portfolio = ledger
            .save_portfolio(&Portfolio::new(user_id, dec!(100000)))
            .await
            .unwrap();

        // Cancel wins the race after the fill attempt read the order.
        let mut cancelled = order.clone();
        cancelled.cancel().unwrap();
        ledger.update_order(&cancelled).await.unwrap();

        let fill = Fill {
            quantity: dec!(1),
            price: dec!(49000),
            total_amount: dec!(49000),
            commission: dec!(49),
        };
        order.record_fill(&fill).unwrap();
        let trade = Trade::from_fill(&order, &fill, None);
        let holding = Holding::open(user_id, "BTCUSDT", dec!(1), dec!(49000));

        let result = ledger.commit_fill(&order, &trade, &holding, &portfolio).await;
        assert!(matches!(result, Err(LedgerError::VersionConflict { .. })));
        assert_eq!(
            ledger.get_order(order.id).await.unwrap().status,
            OrderStatus::Cancelled
        );
    }
}
