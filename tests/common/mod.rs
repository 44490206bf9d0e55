//! Shared test helpers: in-memory fakes for every port.

#![allow(dead_code)]

use async_trait::async_trait;
use etf_autobuy::application::execution::DecisionPorts;
use etf_autobuy::application::portfolio::PortfolioPorts;
use etf_autobuy::application::snapshot::MarketSnapshot;
use etf_autobuy::application::trade_summary::TradeSummary;
use etf_autobuy::config::AppConfig;
use etf_autobuy::domain::entities::holding::Holding;
use etf_autobuy::domain::entities::trade::TradeEntry;
use etf_autobuy::domain::error::DomainError;
use etf_autobuy::domain::ports::brokerage::{
    BalanceSource, HoldingsSource, OrderExecutor, OrderReceipt,
};
use etf_autobuy::domain::ports::notification_sink::NotificationSink;
use etf_autobuy::domain::ports::portfolio_store::{PortfolioStore, PriceHistoryFilter};
use etf_autobuy::domain::ports::price_source::{PriceSource, Quote};
use etf_autobuy::domain::ports::trade_recorder::{TradeFilter, TradeRecorder};
use etf_autobuy::domain::values::allocation::BuyMode;
use etf_autobuy::domain::values::buy_order::{BuyOrder, ResolvedPlan};
use etf_autobuy::domain::values::dip::DipOpportunity;
use etf_autobuy::domain::values::portfolio::{PortfolioSummary, PriceRecord};
use etf_autobuy::AutoInvestor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn quote(current: f64, high: f64) -> Quote {
    Quote {
        current_price: current,
        reference_high: high,
        reference_low: current * 0.8,
        previous_close: current,
    }
}

/// Fixed quote map. Codes missing from the map fail to fetch.
#[derive(Default)]
pub struct FixedPrices {
    quotes: Mutex<HashMap<String, Quote>>,
}

impl FixedPrices {
    pub fn new(pairs: &[(&str, Quote)]) -> Self {
        Self {
            quotes: Mutex::new(pairs.iter().map(|(c, q)| (c.to_string(), *q)).collect()),
        }
    }

    pub fn set(&self, code: &str, q: Quote) {
        self.quotes.lock().unwrap().insert(code.to_string(), q);
    }
}

#[async_trait]
impl PriceSource for FixedPrices {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn get_price(&self, code: &str) -> Result<Quote, DomainError> {
        self.quotes
            .lock()
            .unwrap()
            .get(code)
            .copied()
            .ok_or_else(|| DomainError::PriceFetch {
                code: code.to_string(),
                reason: "no quote".into(),
            })
    }
}

/// Broker with a fixed balance that rejects codes listed in `reject`.
/// Holdings are whatever the test seeds with `holding`.
pub struct ScriptedBroker {
    pub balance: f64,
    pub reject: Vec<String>,
    pub holdings: Vec<Holding>,
    pub submitted: Mutex<Vec<(String, u64)>>,
    pub submitted_at: Mutex<Vec<tokio::time::Instant>>,
}

impl ScriptedBroker {
    pub fn new(balance: f64) -> Self {
        Self {
            balance,
            reject: Vec::new(),
            holdings: Vec::new(),
            submitted: Mutex::new(Vec::new()),
            submitted_at: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(mut self, code: &str) -> Self {
        self.reject.push(code.to_string());
        self
    }

    /// Seed a position marked at its average price.
    pub fn holding(mut self, code: &str, quantity: u64, avg_price: f64) -> Self {
        self.holdings.push(Holding {
            code: code.to_string(),
            name: code.to_string(),
            quantity,
            avg_price,
            current_price: avg_price,
        });
        self
    }

    pub fn submitted(&self) -> Vec<(String, u64)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_at(&self) -> Vec<tokio::time::Instant> {
        self.submitted_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl HoldingsSource for ScriptedBroker {
    async fn get_holdings(&self) -> Result<Vec<Holding>, DomainError> {
        Ok(self.holdings.clone())
    }
}

#[async_trait]
impl BalanceSource for ScriptedBroker {
    async fn get_cash_balance(&self) -> Result<f64, DomainError> {
        Ok(self.balance)
    }
}

#[async_trait]
impl OrderExecutor for ScriptedBroker {
    async fn submit_buy(&self, code: &str, quantity: u64) -> Result<OrderReceipt, DomainError> {
        self.submitted_at
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        self.submitted
            .lock()
            .unwrap()
            .push((code.to_string(), quantity));
        if self.reject.iter().any(|c| c == code) {
            return Ok(OrderReceipt::rejected("rejected by broker"));
        }
        Ok(OrderReceipt::accepted(format!("ord-{code}"), "ok"))
    }
}

/// Records each announcement as a short tag.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn announce_plan(&self, plan: &ResolvedPlan, mode: BuyMode) -> Result<(), DomainError> {
        self.push(format!("plan:{mode}:{}", plan.orders.len()));
        Ok(())
    }

    async fn announce_opportunity(
        &self,
        opportunity: &DipOpportunity,
        recommended: Option<&BuyOrder>,
    ) -> Result<(), DomainError> {
        self.push(format!(
            "opportunity:{}:{}",
            opportunity.code,
            recommended.map(|o| o.quantity).unwrap_or(0)
        ));
        Ok(())
    }

    async fn announce_trade(&self, trade: &TradeEntry) -> Result<(), DomainError> {
        self.push(format!("trade:{}:{}", trade.code, trade.quantity));
        Ok(())
    }

    async fn announce_failure(&self, order: &BuyOrder, _reason: &str) -> Result<(), DomainError> {
        self.push(format!("failure:{}", order.code));
        Ok(())
    }

    async fn announce_shortage(&self, required: f64, available: f64) -> Result<(), DomainError> {
        self.push(format!("shortage:{required}:{available}"));
        Ok(())
    }

    async fn announce_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), DomainError> {
        self.push(format!("snapshot:{}", snapshot.instruments.len()));
        Ok(())
    }

    async fn announce_trade_summary(&self, summary: &TradeSummary) -> Result<(), DomainError> {
        self.push(format!("summary:{}", summary.label));
        Ok(())
    }

    async fn announce_portfolio(&self, summary: &PortfolioSummary) -> Result<(), DomainError> {
        self.push(format!("portfolio:{}", summary.holdings.len()));
        Ok(())
    }

    async fn announce_system_error(&self, message: &str) -> Result<(), DomainError> {
        self.push(format!("error:{message}"));
        Ok(())
    }

    async fn announce_message(&self, message: &str) -> Result<(), DomainError> {
        self.push(format!("message:{message}"));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRecorder {
    pub trades: Mutex<Vec<TradeEntry>>,
}

impl TradeRecorder for MemoryRecorder {
    fn record(&self, trade: &TradeEntry) -> Result<(), DomainError> {
        self.trades.lock().unwrap().push(trade.clone());
        Ok(())
    }

    fn list(&self, filter: &TradeFilter) -> Result<Vec<TradeEntry>, DomainError> {
        let mut trades: Vec<TradeEntry> = self
            .trades
            .lock()
            .unwrap()
            .iter()
            .filter(|t| filter.since.map_or(true, |s| t.created_at >= s))
            .filter(|t| filter.mode.map_or(true, |m| t.mode == m))
            .cloned()
            .collect();
        trades.reverse();
        if let Some(limit) = filter.limit {
            trades.truncate(limit);
        }
        Ok(trades)
    }
}

#[derive(Default)]
pub struct MemoryPortfolioStore {
    pub portfolio: Mutex<Option<PortfolioSummary>>,
    pub prices: Mutex<Vec<PriceRecord>>,
}

impl PortfolioStore for MemoryPortfolioStore {
    fn save_portfolio(&self, summary: &PortfolioSummary) -> Result<(), DomainError> {
        *self.portfolio.lock().unwrap() = Some(summary.clone());
        Ok(())
    }

    fn load_portfolio(&self) -> Result<Option<PortfolioSummary>, DomainError> {
        Ok(self.portfolio.lock().unwrap().clone())
    }

    fn record_prices(&self, records: &[PriceRecord]) -> Result<(), DomainError> {
        self.prices.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    fn price_history(&self, filter: &PriceHistoryFilter) -> Result<Vec<PriceRecord>, DomainError> {
        let mut records: Vec<PriceRecord> = self
            .prices
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.code.as_ref().map_or(true, |c| &r.code == c))
            .cloned()
            .collect();
        records.reverse();
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}

/// Handles on every fake so tests can inspect them after a run.
pub struct Fakes {
    pub prices: Arc<FixedPrices>,
    pub broker: Arc<ScriptedBroker>,
    pub notifier: Arc<RecordingNotifier>,
    pub recorder: Arc<MemoryRecorder>,
    pub store: Arc<MemoryPortfolioStore>,
}

impl Fakes {
    pub fn new(prices: FixedPrices, broker: ScriptedBroker) -> Self {
        Self {
            prices: Arc::new(prices),
            broker: Arc::new(broker),
            notifier: Arc::new(RecordingNotifier::default()),
            recorder: Arc::new(MemoryRecorder::default()),
            store: Arc::new(MemoryPortfolioStore::default()),
        }
    }

    pub fn portfolio_ports(&self) -> PortfolioPorts {
        PortfolioPorts {
            holdings: self.broker.clone(),
            store: self.store.clone(),
        }
    }

    pub fn ports(&self) -> DecisionPorts {
        DecisionPorts {
            prices: self.prices.clone(),
            balance: self.broker.clone(),
            executor: self.broker.clone(),
            recorder: self.recorder.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

/// Two-instrument config matching the weighted end-to-end scenario.
pub fn config_json(auto_trade: bool, redistribution: &str) -> String {
    format!(
        r#"{{
        "strategy": {{
            "allocation_method": "WEIGHTED",
            "dip_allocation_method": "FOCUS",
            "monthly_regular_amount": 300000,
            "dip_buy_amount": 500000,
            "dip_threshold": -5.0,
            "buy_day": 15,
            "redistribution": "{redistribution}"
        }},
        "advanced": {{ "auto_trade": {auto_trade}, "api_delay_seconds": 0 }},
        "instruments": [
            {{ "code": "A", "name": "Alpha", "category": "EQUITY", "weight": 2, "priority": 1 }},
            {{ "code": "B", "name": "Beta", "category": "BOND", "weight": 1, "priority": 2 }}
        ],
        "database_path": ":memory:"
    }}"#
    )
}

pub fn config(auto_trade: bool, redistribution: &str) -> AppConfig {
    AppConfig::from_json_str(&config_json(auto_trade, redistribution)).unwrap()
}

pub fn investor(config: AppConfig, fakes: &Fakes) -> AutoInvestor {
    AutoInvestor::with_ports(config, fakes.ports(), fakes.portfolio_ports()).unwrap()
}
