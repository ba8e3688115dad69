use async_trait::async_trait;
use uuid::Uuid;

/// The subscription gate consulted before a placement is admitted.
///
/// The engine itself never decides who may trade; the hosting application
/// supplies the policy behind this trait.
#[async_trait]
pub trait TradingGate: Send + Sync {
    async fn is_trading_enabled(&self, user_id: Uuid) -> bool;
}

/// The default gate: every account may trade.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllGate;

#[async_trait]
impl TradingGate for AllowAllGate {
    async fn is_trading_enabled(&self, _user_id: Uuid) -> bool {
        true
    }
}
