use crate::domain::entities::holding::Holding;
use crate::domain::error::DomainError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Brokerage answer to a buy submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub success: bool,
    pub order_id: Option<String>,
    pub message: String,
}

impl OrderReceipt {
    pub fn accepted(order_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            order_id: Some(order_id.into()),
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id: None,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Cash available for orders.
    async fn get_cash_balance(&self) -> Result<f64, DomainError>;
}

#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Submit a market buy. `Err` means the request never got an answer;
    /// a rejection comes back as `Ok` with `success == false`.
    async fn submit_buy(&self, code: &str, quantity: u64) -> Result<OrderReceipt, DomainError>;
}

#[async_trait]
pub trait HoldingsSource: Send + Sync {
    /// Current positions. `current_price` is the brokerage's last mark and
    /// may be stale.
    async fn get_holdings(&self) -> Result<Vec<Holding>, DomainError>;
}
