use crate::error::LedgerError;
use async_trait::async_trait;
use core_types::{Holding, Order, Portfolio, Trade};
use uuid::Uuid;

/// The generic, abstract interface to durable ledger storage.
///
/// This trait is the single seam between the engine and whatever actually
/// holds the records. Orders and trades are append-and-update rows with no
/// concurrency stamp; `Holding` and `Portfolio` carry a `version` field and
/// every save is a compare-and-swap against the version the caller read.
/// A mismatch fails with `LedgerError::VersionConflict` and the caller is
/// expected to re-read, re-validate and re-write.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // --- Orders ---

    /// Persists a new order row.
    async fn insert_order(&self, order: &Order) -> Result<(), LedgerError>;

    /// Replaces an existing order row. The stored row must still be open and
    /// at the same fill progress the caller read; anything else means a
    /// concurrent fill or cancel won the race and the write conflicts.
    async fn update_order(&self, order: &Order) -> Result<(), LedgerError>;

    async fn get_order(&self, order_id: Uuid) -> Result<Order, LedgerError>;

    /// All orders for a user, newest first.
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, LedgerError>;

    /// Orders still open for a user, newest first.
    async fn open_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, LedgerError>;

    /// Every pending limit order across all users, oldest first. The sweep
    /// relies on this ordering for price-time fairness.
    async fn pending_limit_orders(&self) -> Result<Vec<Order>, LedgerError>;

    // --- Trades ---

    /// Appends one immutable trade record.
    async fn insert_trade(&self, trade: &Trade) -> Result<(), LedgerError>;

    /// The fills of one order in execution order.
    async fn trades_for_order(&self, order_id: Uuid) -> Result<Vec<Trade>, LedgerError>;

    // --- Holdings ---

    async fn get_holding(
        &self,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Holding>, LedgerError>;

    async fn holdings_for_user(&self, user_id: Uuid) -> Result<Vec<Holding>, LedgerError>;

    /// Compare-and-swap save. A row with `version == 0` inserts; any other
    /// version must match the stored stamp. Returns the row as stored, with
    /// its bumped version.
    async fn save_holding(&self, holding: &Holding) -> Result<Holding, LedgerError>;

    // --- Portfolios ---

    async fn get_portfolio(&self, user_id: Uuid) -> Result<Option<Portfolio>, LedgerError>;

    /// Compare-and-swap save with the same stamp rules as `save_holding`.
    async fn save_portfolio(&self, portfolio: &Portfolio) -> Result<Portfolio, LedgerError>;

    // --- Transactional fill commit ---

    /// Commits one fill as a unit: the updated order, its new trade, and the
    /// holding/portfolio rows the accountant produced. Every precondition is
    /// checked before anything is written, so the unit lands together or not
    /// at all:
    ///
    /// - the stored order must still be open (a cancel that won the race
    ///   fails the commit with a version conflict);
    /// - both version stamps must match, with the `version == 0` insert rule.
    async fn commit_fill(
        &self,
        order: &Order,
        trade: &Trade,
        holding: &Holding,
        portfolio: &Portfolio,
    ) -> Result<(), LedgerError>;
}
