//! Market snapshot use case: current prices versus reference highs, plus
//! available cash. Feeds the morning report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::application::dip_detector::ReferenceHighCache;
use crate::domain::entities::instrument::Instrument;
use crate::domain::error::DomainError;
use crate::domain::ports::brokerage::BalanceSource;
use crate::domain::ports::price_source::PriceSource;
use crate::domain::values::buy_order::{SkipReason, Skipped};
use crate::domain::values::dip::{drop_rate, PriceStatus};
use crate::domain::values::portfolio::PriceRecord;

#[derive(Debug, Clone, Serialize)]
pub struct InstrumentSnapshot {
    pub code: String,
    pub name: String,
    pub current_price: f64,
    pub reference_high: f64,
    pub reference_low: f64,
    pub previous_close: f64,
    pub drop_rate: f64,
    pub change: f64,
    pub change_rate: f64,
    pub status: PriceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub taken_at: DateTime<Utc>,
    pub threshold_percent: f64,
    pub instruments: Vec<InstrumentSnapshot>,
    pub skipped: Vec<Skipped>,
    pub cash_balance: f64,
}

impl MarketSnapshot {
    pub fn opportunities(&self) -> impl Iterator<Item = &InstrumentSnapshot> {
        self.instruments
            .iter()
            .filter(|i| i.status == PriceStatus::Opportunity)
    }

    /// Price-history rows stamped with `taken_at`.
    pub fn price_records(&self) -> Vec<PriceRecord> {
        self.instruments
            .iter()
            .map(|i| PriceRecord {
                code: i.code.clone(),
                name: i.name.clone(),
                current_price: i.current_price,
                reference_high: i.reference_high,
                reference_low: i.reference_low,
                previous_close: i.previous_close,
                drop_rate: i.drop_rate,
                status: i.status,
                recorded_at: self.taken_at,
            })
            .collect()
    }
}

pub async fn take_snapshot(
    universe: &[Instrument],
    prices: &dyn PriceSource,
    balance: &dyn BalanceSource,
    reference_highs: &ReferenceHighCache,
    threshold_percent: f64,
) -> Result<MarketSnapshot, DomainError> {
    let mut instruments = Vec::with_capacity(universe.len());
    let mut skipped = Vec::new();

    for instrument in universe {
        let quote = match prices.get_price(&instrument.code).await {
            Ok(q) => q,
            Err(e) => {
                warn!(code = %instrument.code, error = %e, "snapshot price fetch failed");
                skipped.push(Skipped {
                    code: instrument.code.clone(),
                    reason: SkipReason::PriceFetchFailed(e.to_string()),
                });
                continue;
            }
        };

        let reference_high = reference_highs
            .get(&instrument.code)
            .unwrap_or(quote.reference_high);
        if reference_high <= 0.0 {
            skipped.push(Skipped {
                code: instrument.code.clone(),
                reason: SkipReason::InvalidReferenceHigh(reference_high),
            });
            continue;
        }
        let rate = drop_rate(quote.current_price, reference_high);

        instruments.push(InstrumentSnapshot {
            code: instrument.code.clone(),
            name: instrument.name.clone(),
            current_price: quote.current_price,
            reference_high,
            reference_low: quote.reference_low,
            previous_close: quote.previous_close,
            drop_rate: rate,
            change: quote.change(),
            change_rate: quote.change_rate(),
            status: PriceStatus::classify(rate, threshold_percent),
        });
    }

    let cash_balance = balance.get_cash_balance().await?;

    Ok(MarketSnapshot {
        taken_at: Utc::now(),
        threshold_percent,
        instruments,
        skipped,
        cash_balance,
    })
}
