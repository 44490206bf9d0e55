use crate::domain::entities::trade::TradeEntry;
use crate::domain::error::DomainError;
use crate::domain::values::allocation::BuyMode;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub limit: Option<usize>,
    pub since: Option<DateTime<Utc>>,
    pub mode: Option<BuyMode>,
}

/// Append-only trade ledger.
pub trait TradeRecorder: Send + Sync {
    fn record(&self, trade: &TradeEntry) -> Result<(), DomainError>;
    /// Newest first.
    fn list(&self, filter: &TradeFilter) -> Result<Vec<TradeEntry>, DomainError>;
}
