//! Allocation engine: splits a cash amount across a universe of funds.
//!
//! Pure computation. The engine holds only its configured methods and
//! category limits; the universe is passed on every call and never retained,
//! so a dip run over a narrowed universe cannot leak into the next call.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::entities::instrument::Instrument;
use crate::domain::error::DomainError;
use crate::domain::values::allocation::{
    AllocationLine, AllocationMethod, BuyMode, CategoryLimits, DipAllocationMethod,
};

/// Tolerance on the sum of declared custom ratios before a warning is logged.
const CUSTOM_RATIO_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct AllocationEngine {
    regular_method: AllocationMethod,
    dip_method: DipAllocationMethod,
    category_limits: CategoryLimits,
}

impl AllocationEngine {
    pub fn new(
        regular_method: AllocationMethod,
        dip_method: DipAllocationMethod,
        category_limits: CategoryLimits,
    ) -> Self {
        Self {
            regular_method,
            dip_method,
            category_limits,
        }
    }

    pub fn regular_method(&self) -> AllocationMethod {
        self.regular_method
    }

    pub fn dip_method(&self) -> DipAllocationMethod {
        self.dip_method
    }

    /// Allocate `total_amount` for a buy cycle. In DIP mode the caller passes
    /// the universe already narrowed to flagged instruments.
    ///
    /// Result is sorted ascending by priority, ties kept in universe order.
    pub fn allocate(
        &self,
        total_amount: f64,
        mode: BuyMode,
        universe: &[Instrument],
    ) -> Result<Vec<AllocationLine>, DomainError> {
        let method = match mode {
            BuyMode::Regular => self.regular_method,
            BuyMode::Dip => self.dip_method.primitive(),
        };
        self.allocate_with(total_amount, universe, method)
    }

    /// Allocate with an explicit method, bypassing the configured one.
    pub fn allocate_with(
        &self,
        total_amount: f64,
        universe: &[Instrument],
        method: AllocationMethod,
    ) -> Result<Vec<AllocationLine>, DomainError> {
        if universe.is_empty() {
            return Err(DomainError::EmptyUniverse);
        }
        if !(total_amount.is_finite() && total_amount > 0.0) {
            return Err(DomainError::InvalidInput(format!(
                "allocation amount must be positive, got {total_amount}"
            )));
        }

        let mut lines = match method {
            AllocationMethod::Equal => equal_allocation(total_amount, universe),
            AllocationMethod::Weighted => {
                let lines = weighted_allocation(total_amount, universe);
                self.apply_category_limits(lines, total_amount)
            }
            AllocationMethod::Custom => custom_allocation(total_amount, universe)?,
        };

        lines.sort_by_key(|l| l.priority);
        Ok(lines)
    }

    /// Scale down every category whose share of `total_amount` exceeds its
    /// configured cap. The removed amount is not reassigned.
    pub fn apply_category_limits(
        &self,
        mut lines: Vec<AllocationLine>,
        total_amount: f64,
    ) -> Vec<AllocationLine> {
        if self.category_limits.is_empty() {
            return lines;
        }

        let mut category_totals: HashMap<&str, f64> = HashMap::new();
        for line in &lines {
            *category_totals.entry(line.category.as_str()).or_insert(0.0) += line.allocated_amount;
        }

        let mut factors: HashMap<String, f64> = HashMap::new();
        for (category, total) in category_totals {
            let Some(limit) = self.category_limits.get(category) else {
                continue;
            };
            let actual_ratio = total / total_amount;
            if actual_ratio > limit.max_allocation_ratio {
                let factor = limit.max_allocation_ratio / actual_ratio;
                warn!(
                    category,
                    actual_ratio,
                    cap = limit.max_allocation_ratio,
                    "category over its allocation cap, scaling down"
                );
                factors.insert(category.to_string(), factor);
            }
        }

        for line in &mut lines {
            if let Some(factor) = factors.get(&line.category) {
                line.allocated_amount *= factor;
                line.ratio *= factor;
            }
        }
        lines
    }
}

fn line_for(instrument: &Instrument, allocated_amount: f64, ratio: f64) -> AllocationLine {
    AllocationLine {
        code: instrument.code.clone(),
        name: instrument.name.clone(),
        category: instrument.category.clone(),
        allocated_amount,
        ratio,
        priority: instrument.priority,
    }
}

fn equal_allocation(total_amount: f64, universe: &[Instrument]) -> Vec<AllocationLine> {
    let count = universe.len() as f64;
    let per_instrument = total_amount / count;
    universe
        .iter()
        .map(|i| line_for(i, per_instrument, 1.0 / count))
        .collect()
}

fn weighted_allocation(total_amount: f64, universe: &[Instrument]) -> Vec<AllocationLine> {
    let total_weight: f64 = universe.iter().map(|i| i.weight).sum();
    universe
        .iter()
        .map(|i| {
            let ratio = i.weight / total_weight;
            line_for(i, total_amount * ratio, ratio)
        })
        .collect()
}

fn custom_allocation(
    total_amount: f64,
    universe: &[Instrument],
) -> Result<Vec<AllocationLine>, DomainError> {
    let total_ratio: f64 = universe.iter().map(|i| i.custom_ratio.unwrap_or(0.0)).sum();
    if total_ratio <= 0.0 {
        return Err(DomainError::Configuration(
            "CUSTOM allocation needs at least one positive custom_ratio".into(),
        ));
    }
    if (total_ratio - 1.0).abs() > CUSTOM_RATIO_TOLERANCE {
        warn!(total_ratio, "custom_ratio values do not sum to 1, normalizing");
    }

    Ok(universe
        .iter()
        .map(|i| {
            let ratio = i.custom_ratio.unwrap_or(0.0) / total_ratio;
            line_for(i, total_amount * ratio, ratio)
        })
        .collect())
}
