use core_types::{CoreError, OrderStatus, OrderType};
use ledger::{ConflictError, LedgerError};
use market_data::MarketDataError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error(transparent)]
    Price(#[from] MarketDataError),

    #[error("Not enough virtual balance to execute trade. Required: {required}, Available: {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Not enough holdings to execute trade. Requested: {requested}, Available: {available}")]
    InsufficientHoldings {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Trading is not enabled for user {0}")]
    TradingDisabled(Uuid),

    #[error("No portfolio exists for user {0}")]
    PortfolioNotFound(Uuid),

    #[error("Order {0} was not found")]
    OrderNotFound(Uuid),

    #[error("Order {id} cannot be cancelled from status {status:?}")]
    OrderNotCancellable { id: Uuid, status: OrderStatus },

    #[error("Order {id} is no longer open (status {status:?})")]
    OrderNotOpen { id: Uuid, status: OrderStatus },

    #[error("Order type {0:?} cannot be executed")]
    UnsupportedOrderType(OrderType),

    #[error("The ledger stayed contended after all retries; the operation may be retried")]
    ConcurrencyConflict,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ConflictError for ExecutorError {
    fn is_conflict(&self) -> bool {
        matches!(self, ExecutorError::Ledger(inner) if inner.is_conflict())
    }
}
