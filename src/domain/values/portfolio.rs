//! Portfolio state: valued holdings and the daily price history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::holding::Holding;
use crate::domain::values::dip::PriceStatus;

/// One valued position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub code: String,
    pub name: String,
    pub quantity: u64,
    pub avg_price: f64,
    pub current_price: f64,
    pub invested: f64,
    pub valuation: f64,
    pub profit_loss: f64,
    pub profit_rate: f64,
}

impl From<&Holding> for HoldingRow {
    fn from(h: &Holding) -> Self {
        Self {
            code: h.code.clone(),
            name: h.name.clone(),
            quantity: h.quantity,
            avg_price: h.avg_price,
            current_price: h.current_price,
            invested: h.invested(),
            valuation: h.valuation(),
            profit_loss: h.profit_loss(),
            profit_rate: h.profit_rate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub updated_at: DateTime<Utc>,
    pub total_invested: f64,
    pub total_valuation: f64,
    pub profit_loss: f64,
    /// Percent of `total_invested`.
    pub profit_rate: f64,
    /// Largest valuation first.
    pub holdings: Vec<HoldingRow>,
}

impl PortfolioSummary {
    /// Empty positions are dropped.
    pub fn from_holdings(holdings: &[Holding], updated_at: DateTime<Utc>) -> Self {
        let mut rows: Vec<HoldingRow> = holdings
            .iter()
            .filter(|h| h.quantity > 0)
            .map(HoldingRow::from)
            .collect();
        rows.sort_by(|a, b| {
            b.valuation
                .partial_cmp(&a.valuation)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self::from_rows(rows, updated_at)
    }

    /// Recompute totals over stored rows.
    pub fn from_rows(holdings: Vec<HoldingRow>, updated_at: DateTime<Utc>) -> Self {
        let total_invested: f64 = holdings.iter().map(|h| h.invested).sum();
        let total_valuation: f64 = holdings.iter().map(|h| h.valuation).sum();
        let profit_loss = total_valuation - total_invested;
        let profit_rate = if total_invested > 0.0 {
            profit_loss / total_invested * 100.0
        } else {
            0.0
        };

        Self {
            updated_at,
            total_invested,
            total_valuation,
            profit_loss,
            profit_rate,
            holdings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

/// One row of the daily price history written by the morning report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub code: String,
    pub name: String,
    pub current_price: f64,
    pub reference_high: f64,
    pub reference_low: f64,
    pub previous_close: f64,
    pub drop_rate: f64,
    pub status: PriceStatus,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(code: &str, qty: u64, avg: f64, cur: f64) -> Holding {
        Holding {
            code: code.into(),
            name: format!("{code} ETF"),
            quantity: qty,
            avg_price: avg,
            current_price: cur,
        }
    }

    #[test]
    fn test_totals_and_ordering() {
        let summary = PortfolioSummary::from_holdings(
            &[
                holding("A", 2, 100.0, 90.0),
                holding("B", 10, 50.0, 60.0),
                holding("C", 0, 10.0, 10.0),
            ],
            Utc::now(),
        );
        assert_eq!(summary.holdings.len(), 2);
        assert_eq!(summary.holdings[0].code, "B");
        assert_eq!(summary.total_invested, 700.0);
        assert_eq!(summary.total_valuation, 780.0);
        assert_eq!(summary.profit_loss, 80.0);
        assert!((summary.profit_rate - 80.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_portfolio_has_zero_rate() {
        let summary = PortfolioSummary::from_holdings(&[], Utc::now());
        assert!(summary.is_empty());
        assert_eq!(summary.profit_rate, 0.0);
    }
}
