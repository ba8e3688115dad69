use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("No reference price available for symbol: {0}")]
    PriceUnavailable(String),
}
