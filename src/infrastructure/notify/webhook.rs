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
use std::time::Duration;
use tracing::warn;

/// Webhook message bodies are capped at this many characters.
pub const MAX_CONTENT_CHARS: usize = 2000;
const DEFAULT_RETRY_AFTER_SECS: f64 = 5.0;
/// Longest server-requested wait honoured before the retry.
const MAX_RETRY_AFTER_SECS: f64 = 60.0;

/// Posts `{"content": text}` to a chat webhook (Discord-compatible).
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct RateLimited {
    #[serde(default)]
    retry_after: Option<f64>,
}

pub fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CONTENT_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_CONTENT_CHARS - 3).collect();
    out.push_str("...");
    out
}

/// Wait before retrying, clamped to `[0, MAX_RETRY_AFTER_SECS]`. NaN waits zero.
pub fn retry_delay(retry_after: f64) -> Duration {
    Duration::from_secs_f64(retry_after.max(0.0).min(MAX_RETRY_AFTER_SECS))
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn post(&self, text: &str) -> Result<(), DomainError> {
        let body = serde_json::json!({ "content": truncate(text) });

        for attempt in 0..2 {
            let resp = self
                .client
                .post(&self.url)
                .json(&body)
                .send()
                .await
                .map_err(|e| DomainError::Network(e.to_string()))?;

            let status = resp.status();
            if status.is_success() {
                return Ok(());
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt == 0 {
                let wait = resp
                    .json::<RateLimited>()
                    .await
                    .ok()
                    .and_then(|r| r.retry_after)
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                warn!(retry_after = wait, "webhook rate limited, retrying once");
                tokio::time::sleep(retry_delay(wait)).await;
                continue;
            }
            return Err(DomainError::Notification(format!(
                "webhook returned {status}"
            )));
        }

        Err(DomainError::Notification(
            "webhook still rate limited after retry".into(),
        ))
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn announce_plan(&self, plan: &ResolvedPlan, mode: BuyMode) -> Result<(), DomainError> {
        self.post(&format::plan(plan, mode)).await
    }

    async fn announce_opportunity(
        &self,
        opportunity: &DipOpportunity,
        recommended: Option<&BuyOrder>,
    ) -> Result<(), DomainError> {
        self.post(&format::opportunity(opportunity, recommended)).await
    }

    async fn announce_trade(&self, trade: &TradeEntry) -> Result<(), DomainError> {
        self.post(&format::trade(trade)).await
    }

    async fn announce_failure(&self, order: &BuyOrder, reason: &str) -> Result<(), DomainError> {
        self.post(&format::failure(order, reason)).await
    }

    async fn announce_shortage(&self, required: f64, available: f64) -> Result<(), DomainError> {
        self.post(&format::shortage(required, available)).await
    }

    async fn announce_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), DomainError> {
        self.post(&format::snapshot(snapshot)).await
    }

    async fn announce_trade_summary(&self, summary: &TradeSummary) -> Result<(), DomainError> {
        self.post(&format::trade_summary(summary)).await
    }

    async fn announce_portfolio(&self, summary: &PortfolioSummary) -> Result<(), DomainError> {
        self.post(&format::portfolio(summary)).await
    }

    async fn announce_system_error(&self, message: &str) -> Result<(), DomainError> {
        self.post(&format!("System error: {message}")).await
    }

    async fn announce_message(&self, message: &str) -> Result<(), DomainError> {
        self.post(message).await
    }
}
