//! Execution decision: one regular-buy or dip-buy run.
//!
//! ```text
//! BalanceCheck ──short──▶ InsufficientFunds
//!      │
//!  PriceFetch (DIP: narrowed to flagged codes)
//!      │
//!    Plan = AllocationEngine ▶ QuantityResolver
//!      │
//!    Route ──auto_trade──▶ Execute ──▶ Completed
//!          └─────────────▶ AnnounceOnly ──▶ Completed
//! ```
//!
//! Runs are serial. The only state carried between runs is the
//! reference-high cache, which is replaced wholesale on refresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::application::allocation::AllocationEngine;
use crate::application::dip_detector::{DipDetector, ReferenceHighCache};
use crate::application::quantity::QuantityResolver;
use crate::domain::entities::instrument::Instrument;
use crate::domain::entities::trade::TradeEntry;
use crate::domain::error::DomainError;
use crate::domain::ports::brokerage::{BalanceSource, OrderExecutor};
use crate::domain::ports::notification_sink::NotificationSink;
use crate::domain::ports::price_source::PriceSource;
use crate::domain::ports::trade_recorder::TradeRecorder;
use crate::domain::values::allocation::BuyMode;
use crate::domain::values::buy_order::{ResolvedPlan, SkipReason, Skipped};
use crate::domain::values::decision::{DecisionOutcome, ExecutionReport, OrderFailure, Route};
use crate::domain::values::dip::DipScan;

#[derive(Debug, Clone)]
pub struct DecisionSettings {
    pub regular_amount: f64,
    pub dip_amount: f64,
    pub auto_trade: bool,
    /// Pause between successive order submissions.
    pub order_delay: Duration,
}

/// External collaborators the decision layer talks to.
#[derive(Clone)]
pub struct DecisionPorts {
    pub prices: Arc<dyn PriceSource>,
    pub balance: Arc<dyn BalanceSource>,
    pub executor: Arc<dyn OrderExecutor>,
    pub recorder: Arc<dyn TradeRecorder>,
    pub notifier: Arc<dyn NotificationSink>,
}

pub struct ExecutionDecision {
    universe: Vec<Instrument>,
    engine: AllocationEngine,
    resolver: QuantityResolver,
    detector: DipDetector,
    settings: DecisionSettings,
    ports: DecisionPorts,
    reference_highs: ReferenceHighCache,
}

fn log_delivery(result: Result<(), DomainError>, what: &str) {
    if let Err(e) = result {
        warn!(error = %e, "failed to deliver {what} notification");
    }
}

impl ExecutionDecision {
    /// `universe` must already be filtered to enabled instruments.
    pub fn new(
        universe: Vec<Instrument>,
        engine: AllocationEngine,
        resolver: QuantityResolver,
        detector: DipDetector,
        settings: DecisionSettings,
        ports: DecisionPorts,
    ) -> Result<Self, DomainError> {
        if universe.is_empty() {
            return Err(DomainError::EmptyUniverse);
        }
        Ok(Self {
            universe,
            engine,
            resolver,
            detector,
            settings,
            ports,
            reference_highs: ReferenceHighCache::new(),
        })
    }

    pub fn universe(&self) -> &[Instrument] {
        &self.universe
    }

    pub fn settings(&self) -> &DecisionSettings {
        &self.settings
    }

    pub fn detector(&self) -> &DipDetector {
        &self.detector
    }

    pub fn ports(&self) -> &DecisionPorts {
        &self.ports
    }

    pub fn reference_highs(&self) -> &ReferenceHighCache {
        &self.reference_highs
    }

    /// Re-fetch every 52-week high and replace the cache.
    pub async fn refresh_reference_highs(&mut self) -> Vec<Skipped> {
        self.reference_highs
            .refresh(&self.universe, self.ports.prices.as_ref())
            .await
    }

    /// Current prices for `universe`. Failed fetches are reported, not fatal.
    pub async fn fetch_prices(
        &self,
        universe: &[Instrument],
    ) -> (HashMap<String, f64>, Vec<Skipped>) {
        let mut prices = HashMap::with_capacity(universe.len());
        let mut skipped = Vec::new();
        for instrument in universe {
            match self.ports.prices.get_price(&instrument.code).await {
                Ok(quote) => {
                    prices.insert(instrument.code.clone(), quote.current_price);
                }
                Err(e) => {
                    warn!(code = %instrument.code, error = %e, "price fetch failed, omitting");
                    skipped.push(Skipped {
                        code: instrument.code.clone(),
                        reason: SkipReason::PriceFetchFailed(e.to_string()),
                    });
                }
            }
        }
        (prices, skipped)
    }

    /// Allocate and resolve without touching the brokerage.
    pub fn plan(
        &self,
        amount: f64,
        mode: BuyMode,
        universe: &[Instrument],
        prices: &HashMap<String, f64>,
    ) -> Result<ResolvedPlan, DomainError> {
        let lines = self.engine.allocate(amount, mode, universe)?;
        self.resolver.resolve(&lines, prices)
    }

    /// Fetch live prices for the full universe and plan `amount` over it.
    pub async fn preview(&self, amount: f64, mode: BuyMode) -> Result<ResolvedPlan, DomainError> {
        let (prices, fetch_skipped) = self.fetch_prices(&self.universe).await;
        let mut plan = self.plan(amount, mode, &self.universe, &prices)?;
        merge_skipped(&mut plan, fetch_skipped);
        Ok(plan)
    }

    pub async fn scan_dips(&self) -> DipScan {
        self.detector
            .detect(&self.universe, self.ports.prices.as_ref(), &self.reference_highs)
            .await
    }

    pub async fn run_regular(&self) -> Result<DecisionOutcome, DomainError> {
        let required = self.settings.regular_amount;
        info!(required, "regular buy run");

        let available = match self.check_balance(BuyMode::Regular, required).await? {
            Ok(available) => available,
            Err(outcome) => return Ok(outcome),
        };

        let (prices, fetch_skipped) = self.fetch_prices(&self.universe).await;
        if prices.is_empty() {
            return Err(DomainError::PriceFetch {
                code: "*".into(),
                reason: "no prices available for any instrument".into(),
            });
        }

        let mut plan = self.plan(required, BuyMode::Regular, &self.universe, &prices)?;
        merge_skipped(&mut plan, fetch_skipped);

        let report = self
            .route(BuyMode::Regular, plan, None, required, available)
            .await;
        Ok(DecisionOutcome::Completed(report))
    }

    pub async fn run_dip(&self) -> Result<DecisionOutcome, DomainError> {
        let scan = self.scan_dips().await;
        if scan.is_empty() {
            info!(skipped = scan.skipped.len(), "no dip opportunities");
            return Ok(DecisionOutcome::NoOpportunities {
                skipped: scan.skipped.len(),
            });
        }

        let required = self.settings.dip_amount;
        info!(
            opportunities = scan.opportunities.len(),
            required, "dip buy run"
        );

        let available = match self.check_balance(BuyMode::Dip, required).await? {
            Ok(available) => available,
            Err(outcome) => return Ok(outcome),
        };

        // Narrowed copy; the configured universe is never modified.
        let flagged: Vec<Instrument> = self
            .universe
            .iter()
            .filter(|i| scan.opportunities.iter().any(|o| o.code == i.code))
            .cloned()
            .collect();
        let prices: HashMap<String, f64> = scan
            .opportunities
            .iter()
            .map(|o| (o.code.clone(), o.current_price))
            .collect();

        let plan = self.plan(required, BuyMode::Dip, &flagged, &prices)?;
        let report = self
            .route(BuyMode::Dip, plan, Some(scan), required, available)
            .await;
        Ok(DecisionOutcome::Completed(report))
    }

    /// `Ok(Ok(balance))` to continue, `Ok(Err(outcome))` when short.
    async fn check_balance(
        &self,
        mode: BuyMode,
        required: f64,
    ) -> Result<Result<f64, DecisionOutcome>, DomainError> {
        let available = self.ports.balance.get_cash_balance().await?;
        if available < required {
            warn!(%mode, required, available, "insufficient funds");
            log_delivery(
                self.ports.notifier.announce_shortage(required, available).await,
                "shortage",
            );
            return Ok(Err(DecisionOutcome::InsufficientFunds {
                mode,
                required,
                available,
            }));
        }
        info!(available, "balance check passed");
        Ok(Ok(available))
    }

    async fn route(
        &self,
        mode: BuyMode,
        plan: ResolvedPlan,
        scan: Option<DipScan>,
        required_amount: f64,
        available_balance: f64,
    ) -> ExecutionReport {
        let mut report = ExecutionReport {
            mode,
            route: if self.settings.auto_trade {
                Route::Executed
            } else {
                Route::AnnouncedOnly
            },
            required_amount,
            available_balance,
            plan,
            scan,
            succeeded: 0,
            failed: 0,
            trades: Vec::new(),
            failures: Vec::new(),
        };

        if self.settings.auto_trade {
            self.execute_orders(&mut report).await;
        } else {
            self.announce_only(&report).await;
        }

        info!(
            %mode,
            route = %report.route,
            succeeded = report.succeeded,
            failed = report.failed,
            unspent = report.plan.unspent,
            "decision run completed"
        );
        report
    }

    async fn execute_orders(&self, report: &mut ExecutionReport) {
        let mode = report.mode;
        let mut submitted = 0usize;

        for order in report.plan.actionable() {
            if submitted > 0 && !self.settings.order_delay.is_zero() {
                tokio::time::sleep(self.settings.order_delay).await;
            }
            submitted += 1;

            info!(code = %order.code, quantity = order.quantity, "submitting buy");
            let reason = match self.ports.executor.submit_buy(&order.code, order.quantity).await {
                Ok(receipt) if receipt.success => {
                    let trade = TradeEntry::from_order(mode, order, receipt.order_id);
                    if let Err(e) = self.ports.recorder.record(&trade) {
                        warn!(code = %order.code, error = %e, "failed to record trade");
                    }
                    log_delivery(self.ports.notifier.announce_trade(&trade).await, "trade");
                    report.trades.push(trade);
                    report.succeeded += 1;
                    continue;
                }
                Ok(receipt) => receipt.message,
                Err(e) => e.to_string(),
            };

            warn!(code = %order.code, %reason, "buy order failed");
            log_delivery(
                self.ports.notifier.announce_failure(order, &reason).await,
                "order failure",
            );
            report.failures.push(OrderFailure {
                code: order.code.clone(),
                name: order.name.clone(),
                quantity: order.quantity,
                reason,
            });
            report.failed += 1;
        }
    }

    async fn announce_only(&self, report: &ExecutionReport) {
        log_delivery(
            self.ports
                .notifier
                .announce_plan(&report.plan, report.mode)
                .await,
            "plan",
        );

        if let Some(scan) = &report.scan {
            for opportunity in &scan.opportunities {
                let recommended = report.plan.find(&opportunity.code);
                log_delivery(
                    self.ports
                        .notifier
                        .announce_opportunity(opportunity, recommended)
                        .await,
                    "dip alert",
                );
            }
        }
    }
}

/// Fold price-fetch failures into the plan, replacing the resolver's
/// generic "missing price" entries for the same codes.
fn merge_skipped(plan: &mut ResolvedPlan, fetch_skipped: Vec<Skipped>) {
    if fetch_skipped.is_empty() {
        return;
    }
    plan.skipped
        .retain(|s| !fetch_skipped.iter().any(|f| f.code == s.code));
    let mut merged = fetch_skipped;
    merged.append(&mut plan.skipped);
    plan.skipped = merged;
}
