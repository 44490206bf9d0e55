use crate::domain::error::DomainError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Live quote for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub current_price: f64,
    /// 52-week high.
    pub reference_high: f64,
    /// 52-week low.
    pub reference_low: f64,
    pub previous_close: f64,
}

impl Quote {
    pub fn change(&self) -> f64 {
        self.current_price - self.previous_close
    }

    pub fn change_rate(&self) -> f64 {
        if self.previous_close > 0.0 {
            self.change() * 100.0 / self.previous_close
        } else {
            0.0
        }
    }
}

/// Pluggable quote provider (brokerage quote API, Yahoo Finance, ...).
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    async fn get_price(&self, code: &str) -> Result<Quote, DomainError>;
}
