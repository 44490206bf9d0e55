pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use crate::application::allocation::AllocationEngine;
use crate::application::dip_detector::DipDetector;
use crate::application::execution::{DecisionPorts, DecisionSettings, ExecutionDecision};
use crate::application::portfolio::{PortfolioPorts, PortfolioUseCase};
use crate::application::quantity::QuantityResolver;
use crate::application::schedule::{is_buy_day, Job, Scheduler};
use crate::application::snapshot::{take_snapshot, MarketSnapshot};
use crate::application::trade_summary::{TradeSummary, TradeSummaryUseCase};
use crate::config::AppConfig;
use crate::domain::entities::trade::TradeEntry;
use crate::domain::error::DomainError;
use crate::domain::ports::notification_sink::NotificationSink;
use crate::domain::ports::portfolio_store::{PortfolioStore, PriceHistoryFilter};
use crate::domain::ports::price_source::PriceSource;
use crate::domain::ports::trade_recorder::{TradeFilter, TradeRecorder};
use crate::domain::values::allocation::BuyMode;
use crate::domain::values::buy_order::{ResolvedPlan, Skipped};
use crate::domain::values::decision::DecisionOutcome;
use crate::domain::values::dip::DipScan;
use crate::domain::values::portfolio::{PortfolioSummary, PriceRecord};
use crate::infrastructure::feeds::yahoo::YahooPriceSource;
use crate::infrastructure::notify::log::LogSink;
use crate::infrastructure::notify::webhook::WebhookSink;
use crate::infrastructure::paper::broker::PaperBroker;
use crate::infrastructure::sqlite::portfolio_repo::SqlitePortfolioStore;
use crate::infrastructure::sqlite::trade_repo::SqliteTradeRecorder;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Scheduler tick for the long-running loop.
const TICK: Duration = Duration::from_secs(20);

pub struct AutoInvestor {
    config: AppConfig,
    decision: ExecutionDecision,
    summary_uc: TradeSummaryUseCase,
    portfolio_uc: PortfolioUseCase,
}

impl AutoInvestor {
    /// Wire the default adapters: Yahoo quotes, paper brokerage replayed
    /// from the SQLite ledger, SQLite portfolio store, webhook notifications
    /// (log output when no URL is set).
    pub fn new(config: AppConfig) -> Result<Self, DomainError> {
        let prices: Arc<dyn PriceSource> =
            Arc::new(YahooPriceSource::new(config.market_data.symbol_suffix.clone()));
        let recorder: Arc<dyn TradeRecorder> =
            Arc::new(SqliteTradeRecorder::open(&config.database_path)?);
        let store: Arc<dyn PortfolioStore> =
            Arc::new(SqlitePortfolioStore::open(&config.database_path)?);

        let broker = Arc::new(PaperBroker::new(config.paper.initial_cash, prices.clone()));
        let mut history = recorder.list(&TradeFilter::default())?;
        history.reverse();
        broker.replay(&history)?;
        let notifier: Arc<dyn NotificationSink> = match &config.notifications.webhook_url {
            Some(url) => Arc::new(WebhookSink::new(url.clone())),
            None => Arc::new(LogSink),
        };

        Self::with_ports(
            config,
            DecisionPorts {
                prices,
                balance: broker.clone(),
                executor: broker.clone(),
                recorder,
                notifier,
            },
            PortfolioPorts {
                holdings: broker,
                store,
            },
        )
    }

    pub fn with_ports(
        config: AppConfig,
        ports: DecisionPorts,
        portfolio: PortfolioPorts,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        let strategy = &config.strategy;

        let engine = AllocationEngine::new(
            strategy.allocation_method,
            strategy.dip_allocation_method,
            config.category_limits.clone(),
        );
        let resolver = QuantityResolver::new(strategy.redistribution);
        let detector = DipDetector::new(strategy.dip_threshold)?;
        let settings = DecisionSettings {
            regular_amount: strategy.monthly_regular_amount,
            dip_amount: strategy.dip_buy_amount,
            auto_trade: config.advanced.auto_trade,
            order_delay: config.order_delay()?,
        };

        let summary_uc = TradeSummaryUseCase::new(ports.recorder.clone());
        let portfolio_uc = PortfolioUseCase::new(portfolio, ports.prices.clone());
        let decision = ExecutionDecision::new(
            config.enabled_instruments()?,
            engine,
            resolver,
            detector,
            settings,
            ports,
        )?;

        Ok(Self {
            config,
            decision,
            summary_uc,
            portfolio_uc,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn decision(&self) -> &ExecutionDecision {
        &self.decision
    }

    fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.decision.ports().notifier
    }

    /// Regular buy. Without `force`, only runs on the configured buy day.
    pub async fn run_regular(
        &self,
        today: NaiveDate,
        force: bool,
    ) -> Result<DecisionOutcome, DomainError> {
        let buy_day = self.config.strategy.buy_day;
        if !force && !is_buy_day(today, buy_day) {
            return Ok(DecisionOutcome::NotScheduled {
                reason: format!("{today} is not a weekday matching buy day {buy_day}"),
            });
        }
        self.decision.run_regular().await
    }

    pub async fn run_dip(&self) -> Result<DecisionOutcome, DomainError> {
        self.decision.run_dip().await
    }

    pub async fn scan(&self) -> DipScan {
        self.decision.scan_dips().await
    }

    /// Dry plan with live prices. Never submits orders.
    pub async fn plan(&self, amount: f64, mode: BuyMode) -> Result<ResolvedPlan, DomainError> {
        self.decision.preview(amount, mode).await
    }

    pub async fn snapshot(&self) -> Result<MarketSnapshot, DomainError> {
        let ports = self.decision.ports();
        take_snapshot(
            self.decision.universe(),
            ports.prices.as_ref(),
            ports.balance.as_ref(),
            self.decision.reference_highs(),
            self.decision.detector().threshold_percent(),
        )
        .await
    }

    pub async fn refresh_reference_highs(&mut self) -> Vec<Skipped> {
        self.decision.refresh_reference_highs().await
    }

    pub fn trades(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
        mode: Option<BuyMode>,
    ) -> Result<Vec<TradeEntry>, DomainError> {
        self.decision
            .ports()
            .recorder
            .list(&TradeFilter { limit, since, mode })
    }

    pub fn trade_summary(&self, days: i64) -> Result<TradeSummary, DomainError> {
        self.summary_uc.last_days(days)
    }

    /// Mark holdings to market and persist them.
    pub async fn update_portfolio(&self) -> Result<PortfolioSummary, DomainError> {
        self.portfolio_uc.update(self.decision.universe()).await
    }

    /// Portfolio as of the last update.
    pub fn portfolio(&self) -> Result<Option<PortfolioSummary>, DomainError> {
        self.portfolio_uc.latest()
    }

    pub fn price_history(
        &self,
        code: Option<String>,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<PriceRecord>, DomainError> {
        self.portfolio_uc
            .price_history(&PriceHistoryFilter { code, since, limit })
    }

    /// Run one scheduled job. Notification toggles are honoured here.
    pub async fn run_job(&mut self, job: Job, now: NaiveDateTime) -> Result<(), DomainError> {
        info!(%job, "running scheduled job");
        let toggles = self.config.notifications.clone();

        match job {
            Job::RefreshReferenceHighs => {
                let skipped = self.refresh_reference_highs().await;
                if !skipped.is_empty() {
                    warn!(skipped = skipped.len(), "some reference highs unavailable");
                }
            }
            Job::MorningReport => {
                let snapshot = self.snapshot().await?;
                if let Err(e) = self.portfolio_uc.record_prices(&snapshot) {
                    warn!(error = %e, "failed to record price history");
                }
                if toggles.morning_report {
                    self.notifier().announce_snapshot(&snapshot).await?;
                }
            }
            Job::RegularBuy => {
                self.run_regular(now.date(), false).await?;
            }
            Job::DipCheck => {
                if toggles.price_alert || self.config.advanced.auto_trade {
                    self.run_dip().await?;
                }
            }
            Job::WeeklySummary => {
                if toggles.weekly_report {
                    let summary = self.summary_uc.last_days(7)?;
                    self.notifier().announce_trade_summary(&summary).await?;
                    if let Some(portfolio) = self.portfolio_uc.latest()? {
                        self.notifier().announce_portfolio(&portfolio).await?;
                    }
                }
            }
            Job::MonthlySummary => {
                if toggles.monthly_report {
                    let summary = self.summary_uc.previous_month(now.date())?;
                    self.notifier().announce_trade_summary(&summary).await?;
                }
            }
            Job::PortfolioUpdate => {
                self.update_portfolio().await?;
            }
        }
        Ok(())
    }

    /// Scheduler loop. Job errors are logged and announced; the loop keeps
    /// going until Ctrl-C.
    pub async fn run(&mut self) -> Result<(), DomainError> {
        let mut scheduler = Scheduler::new(&self.config.schedule, self.config.strategy.buy_day)?;

        let mode = if self.config.advanced.auto_trade {
            "auto-trade"
        } else {
            "announce-only"
        };
        info!(
            instruments = self.decision.universe().len(),
            mode, "scheduler started"
        );
        if let Err(e) = self
            .notifier()
            .announce_message(&format!("ETF auto-buy started ({mode})"))
            .await
        {
            warn!(error = %e, "failed to announce start");
        }

        self.refresh_reference_highs().await;

        let mut ticker = tokio::time::interval(TICK);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Local::now().naive_local();
                    for job in scheduler.due(now) {
                        if let Err(e) = self.run_job(job, now).await {
                            error!(%job, error = %e, "scheduled job failed");
                            if let Err(ne) = self
                                .notifier()
                                .announce_system_error(&format!("{job}: {e}"))
                                .await
                            {
                                warn!(error = %ne, "failed to announce job error");
                            }
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        if let Err(e) = self.notifier().announce_message("ETF auto-buy stopped").await {
            warn!(error = %e, "failed to announce stop");
        }
        Ok(())
    }
}
