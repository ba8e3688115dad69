use crate::enums::OrderStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Illegal order transition from {from:?}: {reason}")]
    IllegalTransition { from: OrderStatus, reason: String },

    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),
}
