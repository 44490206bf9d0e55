/// Outcomes of one regular-buy or dip-buy decision run

use serde::Serialize;

use crate::domain::entities::trade::TradeEntry;
use crate::domain::values::allocation::BuyMode;
use crate::domain::values::buy_order::ResolvedPlan;
use crate::domain::values::dip::DipScan;

/// Where a plan was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Orders were submitted to the brokerage.
    Executed,
    /// The plan was announced for manual execution.
    AnnouncedOnly,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Executed => write!(f, "executed"),
            Route::AnnouncedOnly => write!(f, "announced_only"),
        }
    }
}

/// An order the brokerage did not accept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderFailure {
    pub code: String,
    pub name: String,
    pub quantity: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub mode: BuyMode,
    pub route: Route,
    pub required_amount: f64,
    pub available_balance: f64,
    pub plan: ResolvedPlan,
    /// Present for dip runs.
    pub scan: Option<DipScan>,
    pub succeeded: usize,
    pub failed: usize,
    pub trades: Vec<TradeEntry>,
    pub failures: Vec<OrderFailure>,
}

/// Terminal state of a decision run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Completed(ExecutionReport),
    InsufficientFunds { mode: BuyMode, required: f64, available: f64 },
    NoOpportunities { skipped: usize },
    /// Regular buy asked for on a day that is not the configured buy day.
    NotScheduled { reason: String },
}

impl DecisionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DecisionOutcome::Completed(_))
    }

    pub fn report(&self) -> Option<&ExecutionReport> {
        match self {
            DecisionOutcome::Completed(r) => Some(r),
            _ => None,
        }
    }
}
