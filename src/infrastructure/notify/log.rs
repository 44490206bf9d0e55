use super::format;
use crate::application::snapshot::MarketSnapshot;
use crate::application::trade_summary::TradeSummary;
use crate::domain::entities::trade::TradeEntry;
use crate::domain::error::DomainError;
use crate::domain::ports::notification_sink::NotificationSink;
use crate::domain::values::allocation::BuyMode;
use crate::domain::values::buy_order::{BuyOrder, ResolvedPlan};
use crate::domain::values::dip::DipOpportunity;
use crate::domain::values::portfolio::PortfolioSummary;
use async_trait::async_trait;
use tracing::{error, info, warn};

/// Writes notifications to the log. Used when no webhook is configured.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn announce_plan(&self, plan: &ResolvedPlan, mode: BuyMode) -> Result<(), DomainError> {
        info!(target: "notify", "{}", format::plan(plan, mode));
        Ok(())
    }

    async fn announce_opportunity(
        &self,
        opportunity: &DipOpportunity,
        recommended: Option<&BuyOrder>,
    ) -> Result<(), DomainError> {
        info!(target: "notify", "{}", format::opportunity(opportunity, recommended));
        Ok(())
    }

    async fn announce_trade(&self, trade: &TradeEntry) -> Result<(), DomainError> {
        info!(target: "notify", "{}", format::trade(trade));
        Ok(())
    }

    async fn announce_failure(&self, order: &BuyOrder, reason: &str) -> Result<(), DomainError> {
        warn!(target: "notify", "{}", format::failure(order, reason));
        Ok(())
    }

    async fn announce_shortage(&self, required: f64, available: f64) -> Result<(), DomainError> {
        warn!(target: "notify", "{}", format::shortage(required, available));
        Ok(())
    }

    async fn announce_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), DomainError> {
        info!(target: "notify", "{}", format::snapshot(snapshot));
        Ok(())
    }

    async fn announce_trade_summary(&self, summary: &TradeSummary) -> Result<(), DomainError> {
        info!(target: "notify", "{}", format::trade_summary(summary));
        Ok(())
    }

    async fn announce_portfolio(&self, summary: &PortfolioSummary) -> Result<(), DomainError> {
        info!(target: "notify", "{}", format::portfolio(summary));
        Ok(())
    }

    async fn announce_system_error(&self, message: &str) -> Result<(), DomainError> {
        error!(target: "notify", "System error: {message}");
        Ok(())
    }

    async fn announce_message(&self, message: &str) -> Result<(), DomainError> {
        info!(target: "notify", "{message}");
        Ok(())
    }
}
