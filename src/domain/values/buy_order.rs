//! Whole-unit purchase plans.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::values::allocation::AllocationLine;

/// An allocation line converted into a whole-unit order at a live price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyOrder {
    pub code: String,
    pub name: String,
    pub category: String,
    pub allocated_amount: f64,
    pub ratio: f64,
    pub priority: i64,
    pub current_price: f64,
    /// Units to buy, including any granted from the pooled remainder.
    pub quantity: u64,
    /// Units granted from the pooled remainder.
    pub redistributed_quantity: u64,
    /// `quantity × current_price`.
    pub actual_amount: f64,
    /// `allocated_amount` minus the truncated purchase, before redistribution.
    pub remainder: f64,
}

impl BuyOrder {
    /// Truncate an allocation to whole units. Never rounds up.
    pub fn from_line(line: &AllocationLine, price: f64) -> Self {
        let quantity = (line.allocated_amount / price).floor().max(0.0) as u64;
        let actual_amount = quantity as f64 * price;
        Self {
            code: line.code.clone(),
            name: line.name.clone(),
            category: line.category.clone(),
            allocated_amount: line.allocated_amount,
            ratio: line.ratio,
            priority: line.priority,
            current_price: price,
            quantity,
            redistributed_quantity: 0,
            actual_amount,
            remainder: line.allocated_amount - actual_amount,
        }
    }

    pub(crate) fn grant(&mut self, units: u64) {
        self.quantity += units;
        self.redistributed_quantity += units;
        self.actual_amount = self.quantity as f64 * self.current_price;
    }
}

/// Why an instrument was left out of a plan or scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    MissingPrice,
    PriceFetchFailed(String),
    InvalidReferenceHigh(f64),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingPrice => write!(f, "no price available"),
            SkipReason::PriceFetchFailed(msg) => write!(f, "price fetch failed: {msg}"),
            SkipReason::InvalidReferenceHigh(v) => write!(f, "invalid reference high {v}"),
        }
    }
}

/// An instrument omitted from a result, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skipped {
    pub code: String,
    pub reason: SkipReason,
}

/// Output of the quantity resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlan {
    /// Ascending priority.
    pub orders: Vec<BuyOrder>,
    pub skipped: Vec<Skipped>,
    /// Pooled remainder left after redistribution.
    pub unspent: f64,
}

/// Per-category totals inside a [`PlanSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub total_allocated: f64,
    pub total_invested: f64,
    /// `total_invested / total_allocated × 100`.
    pub efficiency: f64,
    pub total_units: u64,
    pub instrument_count: usize,
    pub categories: Vec<CategoryTotal>,
}

impl ResolvedPlan {
    pub fn total_allocated(&self) -> f64 {
        self.orders.iter().map(|o| o.allocated_amount).sum()
    }

    pub fn total_invested(&self) -> f64 {
        self.orders.iter().map(|o| o.actual_amount).sum()
    }

    /// Orders that would actually be submitted.
    pub fn actionable(&self) -> impl Iterator<Item = &BuyOrder> {
        self.orders.iter().filter(|o| o.quantity > 0)
    }

    pub fn find(&self, code: &str) -> Option<&BuyOrder> {
        self.orders.iter().find(|o| o.code == code)
    }

    pub fn summary(&self) -> PlanSummary {
        let total_allocated = self.total_allocated();
        let total_invested = self.total_invested();
        let efficiency = if total_allocated > 0.0 {
            total_invested / total_allocated * 100.0
        } else {
            0.0
        };

        // First-seen order keeps the breakdown aligned with priority.
        let mut categories: Vec<CategoryTotal> = Vec::new();
        for order in &self.orders {
            match categories.iter_mut().find(|c| c.category == order.category) {
                Some(c) => {
                    c.amount += order.actual_amount;
                    c.count += 1;
                }
                None => categories.push(CategoryTotal {
                    category: order.category.clone(),
                    amount: order.actual_amount,
                    count: 1,
                }),
            }
        }

        PlanSummary {
            total_allocated,
            total_invested,
            efficiency,
            total_units: self.orders.iter().map(|o| o.quantity).sum(),
            instrument_count: self.orders.len(),
            categories,
        }
    }
}
