//! Dip detection against a tracked 52-week high.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::entities::instrument::Instrument;
use crate::domain::error::DomainError;
use crate::domain::ports::price_source::PriceSource;
use crate::domain::values::buy_order::{SkipReason, Skipped};
use crate::domain::values::dip::{drop_rate, DipOpportunity, DipScan};

/// Memoized 52-week highs, owned by the decision layer across cycles.
///
/// The only way to change the contents is a wholesale replace, so entries
/// from different refreshes never mix.
#[derive(Debug, Clone, Default)]
pub struct ReferenceHighCache {
    highs: HashMap<String, f64>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl ReferenceHighCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.highs.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.highs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highs.is_empty()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// Replace the whole cache.
    pub fn replace(&mut self, highs: HashMap<String, f64>) {
        self.highs = highs;
        self.refreshed_at = Some(Utc::now());
    }

    /// Fetch a fresh high for every instrument, then replace the cache.
    /// Instruments whose fetch fails are absent afterwards.
    pub async fn refresh(
        &mut self,
        universe: &[Instrument],
        source: &dyn PriceSource,
    ) -> Vec<Skipped> {
        let mut highs = HashMap::with_capacity(universe.len());
        let mut skipped = Vec::new();

        for instrument in universe {
            match source.get_price(&instrument.code).await {
                Ok(quote) if quote.reference_high > 0.0 => {
                    highs.insert(instrument.code.clone(), quote.reference_high);
                }
                Ok(quote) => skipped.push(Skipped {
                    code: instrument.code.clone(),
                    reason: SkipReason::InvalidReferenceHigh(quote.reference_high),
                }),
                Err(e) => {
                    warn!(code = %instrument.code, error = %e, "reference high refresh failed");
                    skipped.push(Skipped {
                        code: instrument.code.clone(),
                        reason: SkipReason::PriceFetchFailed(e.to_string()),
                    });
                }
            }
        }

        info!(
            cached = highs.len(),
            skipped = skipped.len(),
            "reference highs refreshed"
        );
        self.replace(highs);
        skipped
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DipDetector {
    threshold_percent: f64,
}

impl DipDetector {
    /// `threshold_percent` is a non-positive percentage, e.g. `-5.0`.
    pub fn new(threshold_percent: f64) -> Result<Self, DomainError> {
        if !(threshold_percent.is_finite() && threshold_percent <= 0.0) {
            return Err(DomainError::Configuration(format!(
                "dip threshold must be <= 0, got {threshold_percent}"
            )));
        }
        Ok(Self { threshold_percent })
    }

    pub fn threshold_percent(&self) -> f64 {
        self.threshold_percent
    }

    /// True when `rate` meets or passes the threshold. Inclusive.
    pub fn is_dip(&self, rate: f64) -> bool {
        rate <= self.threshold_percent
    }

    /// Scan the universe. Fetch failures skip the instrument; the scan
    /// always completes.
    pub async fn detect(
        &self,
        universe: &[Instrument],
        source: &dyn PriceSource,
        reference_highs: &ReferenceHighCache,
    ) -> DipScan {
        let mut scan = DipScan::default();

        for instrument in universe {
            let quote = match source.get_price(&instrument.code).await {
                Ok(q) => q,
                Err(e) => {
                    warn!(code = %instrument.code, error = %e, "price fetch failed, skipping");
                    scan.skipped.push(Skipped {
                        code: instrument.code.clone(),
                        reason: SkipReason::PriceFetchFailed(e.to_string()),
                    });
                    continue;
                }
            };

            let reference_high = reference_highs
                .get(&instrument.code)
                .unwrap_or(quote.reference_high);
            if !(reference_high.is_finite() && reference_high > 0.0) {
                scan.skipped.push(Skipped {
                    code: instrument.code.clone(),
                    reason: SkipReason::InvalidReferenceHigh(reference_high),
                });
                continue;
            }

            let rate = drop_rate(quote.current_price, reference_high);
            if self.is_dip(rate) {
                info!(code = %instrument.code, drop_rate = rate, "dip opportunity");
                scan.opportunities.push(DipOpportunity {
                    code: instrument.code.clone(),
                    name: instrument.name.clone(),
                    category: instrument.category.clone(),
                    current_price: quote.current_price,
                    reference_high,
                    drop_rate: rate,
                });
            }
        }

        scan
    }
}
