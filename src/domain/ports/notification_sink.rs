//! Outbound notifications.
//!
//! The decision layer reports plans, dip alerts, fills, failures and
//! shortages through [`NotificationSink`]. Delivery errors are logged by the
//! caller and never abort a cycle.

use crate::application::snapshot::MarketSnapshot;
use crate::application::trade_summary::TradeSummary;
use crate::domain::entities::trade::TradeEntry;
use crate::domain::error::DomainError;
use crate::domain::values::allocation::BuyMode;
use crate::domain::values::buy_order::{BuyOrder, ResolvedPlan};
use crate::domain::values::dip::DipOpportunity;
use crate::domain::values::portfolio::PortfolioSummary;
use async_trait::async_trait;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Full plan for manual execution.
    async fn announce_plan(&self, plan: &ResolvedPlan, mode: BuyMode) -> Result<(), DomainError>;

    /// One dip alert, with the recommended order when the plan has one.
    async fn announce_opportunity(
        &self,
        opportunity: &DipOpportunity,
        recommended: Option<&BuyOrder>,
    ) -> Result<(), DomainError>;

    async fn announce_trade(&self, trade: &TradeEntry) -> Result<(), DomainError>;

    async fn announce_failure(&self, order: &BuyOrder, reason: &str) -> Result<(), DomainError>;

    async fn announce_shortage(&self, required: f64, available: f64) -> Result<(), DomainError>;

    async fn announce_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), DomainError>;

    async fn announce_trade_summary(&self, summary: &TradeSummary) -> Result<(), DomainError>;

    async fn announce_portfolio(&self, summary: &PortfolioSummary) -> Result<(), DomainError>;

    async fn announce_system_error(&self, message: &str) -> Result<(), DomainError>;

    async fn announce_message(&self, message: &str) -> Result<(), DomainError>;
}
