use crate::domain::error::DomainError;
use crate::domain::values::portfolio::{PortfolioSummary, PriceRecord};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct PriceHistoryFilter {
    pub code: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Persisted portfolio state and price history.
pub trait PortfolioStore: Send + Sync {
    /// Replace the stored portfolio wholesale.
    fn save_portfolio(&self, summary: &PortfolioSummary) -> Result<(), DomainError>;
    /// `None` until the first update.
    fn load_portfolio(&self) -> Result<Option<PortfolioSummary>, DomainError>;
    fn record_prices(&self, records: &[PriceRecord]) -> Result<(), DomainError>;
    /// Newest first.
    fn price_history(&self, filter: &PriceHistoryFilter) -> Result<Vec<PriceRecord>, DomainError>;
}
