//! Trade summary use case: what the ledger says was bought over a window.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::domain::entities::trade::TradeEntry;
use crate::domain::error::DomainError;
use crate::domain::ports::trade_recorder::{TradeFilter, TradeRecorder};
use crate::domain::values::allocation::BuyMode;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentTotal {
    pub code: String,
    pub name: String,
    pub quantity: u64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeSummary {
    pub label: String,
    pub since: DateTime<Utc>,
    pub regular_count: usize,
    pub regular_total: f64,
    pub dip_count: usize,
    pub dip_total: f64,
    pub total_invested: f64,
    pub by_instrument: Vec<InstrumentTotal>,
}

impl TradeSummary {
    pub fn from_trades(
        label: impl Into<String>,
        since: DateTime<Utc>,
        trades: &[TradeEntry],
    ) -> Self {
        let mut summary = TradeSummary {
            label: label.into(),
            since,
            regular_count: 0,
            regular_total: 0.0,
            dip_count: 0,
            dip_total: 0.0,
            total_invested: 0.0,
            by_instrument: Vec::new(),
        };

        for trade in trades {
            match trade.mode {
                BuyMode::Regular => {
                    summary.regular_count += 1;
                    summary.regular_total += trade.total;
                }
                BuyMode::Dip => {
                    summary.dip_count += 1;
                    summary.dip_total += trade.total;
                }
            }
            summary.total_invested += trade.total;

            match summary.by_instrument.iter_mut().find(|i| i.code == trade.code) {
                Some(entry) => {
                    entry.quantity += trade.quantity;
                    entry.total += trade.total;
                }
                None => summary.by_instrument.push(InstrumentTotal {
                    code: trade.code.clone(),
                    name: trade.name.clone(),
                    quantity: trade.quantity,
                    total: trade.total,
                }),
            }
        }

        summary
            .by_instrument
            .sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
        summary
    }
}

pub struct TradeSummaryUseCase {
    recorder: Arc<dyn TradeRecorder>,
}

impl TradeSummaryUseCase {
    pub fn new(recorder: Arc<dyn TradeRecorder>) -> Self {
        Self { recorder }
    }

    pub fn since(&self, label: &str, since: DateTime<Utc>) -> Result<TradeSummary, DomainError> {
        let trades = self.recorder.list(&TradeFilter {
            since: Some(since),
            ..Default::default()
        })?;
        Ok(TradeSummary::from_trades(label, since, &trades))
    }

    /// Trades in `[since, until)`.
    pub fn between(
        &self,
        label: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<TradeSummary, DomainError> {
        let trades: Vec<TradeEntry> = self
            .recorder
            .list(&TradeFilter {
                since: Some(since),
                ..Default::default()
            })?
            .into_iter()
            .filter(|t| t.created_at < until)
            .collect();
        Ok(TradeSummary::from_trades(label, since, &trades))
    }

    /// Trailing `days` days.
    pub fn last_days(&self, days: i64) -> Result<TradeSummary, DomainError> {
        let since = Utc::now() - Duration::days(days);
        self.since(&format!("last {days} days"), since)
    }

    /// The calendar month before the one containing `today`. Sent on the
    /// first of the month.
    pub fn previous_month(&self, today: NaiveDate) -> Result<TradeSummary, DomainError> {
        let first = first_of_month(today);
        let previous = first_of_month(first.pred_opt().unwrap_or(first));
        self.between(
            &previous.format("%Y-%m").to_string(),
            midnight(previous),
            midnight(first),
        )
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}
