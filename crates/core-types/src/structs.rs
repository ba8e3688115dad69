use crate::enums::{OrderSide, OrderStatus, OrderType};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request to place an order, before it has been admitted to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub user_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Required for Limit/StopLoss/TakeProfit orders; ignored for Market orders.
    pub limit_price: Option<Decimal>,
}

/// One fill event as applied to an order: the executed quantity, the price it
/// executed at, and the money that moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub quantity: Decimal,
    pub price: Decimal,
    pub total_amount: Decimal,
    pub commission: Decimal,
}

/// A single user's request to trade a symbol, tracked from placement to its
/// terminal state.
///
/// The struct owns its legal transitions: `record_fill`, `cancel` and
/// `reject` are the only mutation points, and each enforces the invariant
/// `0 <= filled_quantity <= quantity` with status derived from that relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    /// Quantity-weighted average price across this order's trades.
    pub average_price: Option<Decimal>,
    pub total_amount: Decimal,
    pub commission: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Validates a placement request and creates the order in `Pending`.
    pub fn new(request: OrderRequest) -> Result<Self, CoreError> {
        if request.quantity <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "quantity".to_string(),
                format!("must be positive, got {}", request.quantity),
            ));
        }

        // Market orders execute at the reference price; a client-supplied
        // price is meaningless and dropped. Every other type needs one.
        let limit_price = match request.order_type {
            OrderType::Market => None,
            _ => match request.limit_price {
                Some(price) if price > Decimal::ZERO => Some(price),
                Some(price) => {
                    return Err(CoreError::InvalidInput(
                        "limit_price".to_string(),
                        format!("must be positive, got {}", price),
                    ));
                }
                None => {
                    return Err(CoreError::InvalidInput(
                        "limit_price".to_string(),
                        format!("required for {:?} orders", request.order_type),
                    ));
                }
            },
        };

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            symbol: request.symbol,
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            limit_price,
            status: OrderStatus::Pending,
            filled_quantity: Decimal::ZERO,
            average_price: None,
            total_amount: Decimal::ZERO,
            commission: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        })
    }

    /// The quantity still open for execution.
    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Applies one fill to the order, recomputing the weighted average price
    /// and deriving the new status from the fill relation.
    pub fn record_fill(&mut self, fill: &Fill) -> Result<(), CoreError> {
        if !self.status.is_open() {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                reason: "only open orders can receive fills".to_string(),
            });
        }
        if fill.quantity <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "fill.quantity".to_string(),
                format!("must be positive, got {}", fill.quantity),
            ));
        }
        let new_filled = self.filled_quantity + fill.quantity;
        if new_filled > self.quantity {
            return Err(CoreError::InvariantViolation(format!(
                "fill of {} would overfill order {} ({} of {} already filled)",
                fill.quantity, self.id, self.filled_quantity, self.quantity
            )));
        }

        let previous_value = self
            .average_price
            .map(|avg| avg * self.filled_quantity)
            .unwrap_or(Decimal::ZERO);
        self.average_price = Some((previous_value + fill.price * fill.quantity) / new_filled);

        self.filled_quantity = new_filled;
        self.total_amount += fill.total_amount;
        self.commission += fill.commission;
        self.status = Self::fill_status(new_filled, self.quantity);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Cancels the order. Succeeds only while the order is untouched; a
    /// partially filled order has already moved money and stays live.
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        if self.status != OrderStatus::Pending {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                reason: "only pending orders can be cancelled".to_string(),
            });
        }
        self.status = OrderStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Marks the order rejected. Terminal; no further mutation is accepted.
    pub fn reject(&mut self) -> Result<(), CoreError> {
        if !self.status.is_open() {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                reason: "only open orders can be rejected".to_string(),
            });
        }
        self.status = OrderStatus::Rejected;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Status is a pure function of the fill relation for live orders.
    fn fill_status(filled: Decimal, quantity: Decimal) -> OrderStatus {
        if filled == quantity {
            OrderStatus::Filled
        } else if filled > Decimal::ZERO {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Pending
        }
    }
}

/// An immutable record of one fill event. An order may produce several
/// trades under partial fills; the sum of their quantities always equals the
/// order's filled quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total_amount: Decimal,
    pub commission: Decimal,
    /// `(price - average_cost) * quantity`, recorded on Sell fills only.
    pub realized_pnl: Option<Decimal>,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Builds the trade record for one fill of `order`.
    pub fn from_fill(order: &Order, fill: &Fill, realized_pnl: Option<Decimal>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            user_id: order.user_id,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: fill.quantity,
            price: fill.price,
            total_amount: fill.total_amount,
            commission: fill.commission,
            realized_pnl,
            executed_at: Utc::now(),
        }
    }
}

/// Aggregate position for one (user, symbol) pair.
///
/// The row is created on the first Buy fill and persists at zero quantity
/// after a full liquidation so cost history survives. `version` is the
/// optimistic-concurrency stamp checked by the ledger on every save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub total_cost: Decimal,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// Opens a fresh position from the first Buy fill.
    pub fn open(user_id: Uuid, symbol: &str, quantity: Decimal, price: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol: symbol.to_string(),
            quantity,
            average_cost: price,
            total_cost: quantity * price,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One row per user: the virtual cash balance and invested capital.
///
/// Market value and PnL are derived from current reference prices on the
/// read path, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub user_id: Uuid,
    pub virtual_balance: Decimal,
    pub total_invested: Decimal,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Portfolio {
    /// Creates the account with its starting virtual balance.
    pub fn new(user_id: Uuid, starting_balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            virtual_balance: starting_balance,
            total_invested: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market_request(quantity: Decimal) -> OrderRequest {
        OrderRequest {
            user_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
        }
    }

    fn fill(quantity: Decimal, price: Decimal) -> Fill {
        Fill {
            quantity,
            price,
            total_amount: quantity * price,
            commission: Decimal::ZERO,
        }
    }

    #[test]
    fn rejects_non_positive_quantity() {
        assert!(Order::new(market_request(dec!(0))).is_err());
        assert!(Order::new(market_request(dec!(-1))).is_err());
    }

    #[test]
    fn limit_order_requires_positive_limit_price() {
        let mut request = market_request(dec!(1));
        request.order_type = OrderType::Limit;
        assert!(Order::new(request.clone()).is_err());

        request.limit_price = Some(dec!(-5));
        assert!(Order::new(request.clone()).is_err());

        request.limit_price = Some(dec!(50000));
        assert!(Order::new(request).is_ok());
    }

    #[test]
    fn market_order_drops_client_supplied_price() {
        let mut request = market_request(dec!(1));
        request.limit_price = Some(dec!(123));
        let order = Order::new(request).unwrap();
        assert_eq!(order.limit_price, None);
    }

    #[test]
    fn status_follows_fill_relation() {
        let mut order = Order::new(market_request(dec!(10))).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        order.record_fill(&fill(dec!(4), dec!(100))).unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.filled_quantity, dec!(4));

        order.record_fill(&fill(dec!(6), dec!(100))).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_quantity, order.quantity);
    }

    #[test]
    fn average_price_is_quantity_weighted() {
        let mut order = Order::new(market_request(dec!(3))).unwrap();
        order.record_fill(&fill(dec!(1), dec!(100))).unwrap();
        order.record_fill(&fill(dec!(2), dec!(130))).unwrap();
        assert_eq!(order.average_price, Some(dec!(120)));
    }

    #[test]
    fn overfill_is_refused() {
        let mut order = Order::new(market_request(dec!(5))).unwrap();
        order.record_fill(&fill(dec!(5), dec!(100))).unwrap();
        assert!(order.record_fill(&fill(dec!(1), dec!(100))).is_err());
    }

    #[test]
    fn filled_order_refuses_further_fills() {
        let mut order = Order::new(market_request(dec!(1))).unwrap();
        order.record_fill(&fill(dec!(1), dec!(100))).unwrap();
        let result = order.record_fill(&fill(dec!(1), dec!(100)));
        assert!(matches!(
            result,
            Err(CoreError::IllegalTransition { from: OrderStatus::Filled, .. })
        ));
    }

    #[test]
    fn cancel_succeeds_exactly_once_from_pending() {
        let mut order = Order::new(market_request(dec!(1))).unwrap();
        order.cancel().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.cancel().is_err());
    }

    #[test]
    fn partially_filled_order_cannot_be_cancelled() {
        let mut order = Order::new(market_request(dec!(2))).unwrap();
        order.record_fill(&fill(dec!(1), dec!(100))).unwrap();
        assert!(order.cancel().is_err());
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
    }

    #[test]
    fn reject_is_terminal() {
        let mut order = Order::new(market_request(dec!(1))).unwrap();
        order.reject().unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);
        assert!(order.reject().is_err());
        assert!(order.record_fill(&fill(dec!(1), dec!(100))).is_err());
    }
}
