//! Dip signals: how far a fund trades below its tracked 52-week high.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;
use crate::domain::values::buy_order::Skipped;

/// Width, in percentage points above the dip threshold, of the caution band.
pub const CAUTION_BAND_PCT: f64 = 2.0;

/// Percentage move from `reference_high` to `current_price`.
/// Negative when trading below the reference.
pub fn drop_rate(current_price: f64, reference_high: f64) -> f64 {
    (current_price - reference_high) * 100.0 / reference_high
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DipOpportunity {
    pub code: String,
    pub name: String,
    pub category: String,
    pub current_price: f64,
    pub reference_high: f64,
    pub drop_rate: f64,
}

/// Result of one dip check cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DipScan {
    /// Universe iteration order.
    pub opportunities: Vec<DipOpportunity>,
    pub skipped: Vec<Skipped>,
}

impl DipScan {
    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.opportunities.iter().map(|o| o.code.as_str()).collect()
    }
}

/// Coarse label for a fund's position relative to the dip threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceStatus {
    Normal,
    Caution,
    Opportunity,
}

impl PriceStatus {
    pub fn classify(drop_rate: f64, threshold_percent: f64) -> Self {
        if drop_rate <= threshold_percent {
            PriceStatus::Opportunity
        } else if drop_rate <= threshold_percent + CAUTION_BAND_PCT {
            PriceStatus::Caution
        } else {
            PriceStatus::Normal
        }
    }
}

impl fmt::Display for PriceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceStatus::Normal => write!(f, "normal"),
            PriceStatus::Caution => write!(f, "caution"),
            PriceStatus::Opportunity => write!(f, "opportunity"),
        }
    }
}

impl FromStr for PriceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(PriceStatus::Normal),
            "caution" => Ok(PriceStatus::Caution),
            "opportunity" => Ok(PriceStatus::Opportunity),
            other => Err(DomainError::Parse(format!("unknown price status {other:?}"))),
        }
    }
}
