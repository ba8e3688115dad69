use ledger::LedgerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
