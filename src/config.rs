//! Application configuration, loaded once from JSON and validated.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::schedule::{ScheduleConfig, Scheduler};
use crate::domain::entities::instrument::{enabled_universe, Instrument};
use crate::domain::error::DomainError;
use crate::domain::values::allocation::{
    AllocationMethod, CategoryLimits, DipAllocationMethod, RedistributionPolicy,
};

pub const CONFIG_ENV: &str = "ETF_AUTOBUY_CONFIG";
pub const WEBHOOK_ENV: &str = "ETF_AUTOBUY_WEBHOOK_URL";
pub const DB_ENV: &str = "ETF_AUTOBUY_DB";
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";
pub const DEFAULT_DB_PATH: &str = "./etf-autobuy.db";
/// Upper bound on the pause between order submissions.
pub const MAX_API_DELAY_SECONDS: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub allocation_method: AllocationMethod,
    pub dip_allocation_method: DipAllocationMethod,
    pub monthly_regular_amount: f64,
    pub dip_buy_amount: f64,
    /// Percent, non-positive. `-5.0` means 5% below the 52-week high.
    pub dip_threshold: f64,
    pub buy_day: u32,
    pub redistribution: RedistributionPolicy,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            allocation_method: AllocationMethod::Equal,
            dip_allocation_method: DipAllocationMethod::Focus,
            monthly_regular_amount: 0.0,
            dip_buy_amount: 0.0,
            dip_threshold: -5.0,
            buy_day: 1,
            redistribution: RedistributionPolicy::StopAtFirst,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    pub auto_trade: bool,
    pub api_delay_seconds: f64,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            auto_trade: false,
            api_delay_seconds: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
    pub morning_report: bool,
    pub weekly_report: bool,
    pub monthly_report: bool,
    pub price_alert: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            morning_report: true,
            weekly_report: true,
            monthly_report: true,
            price_alert: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    pub symbol_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub initial_cash: f64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_cash: 10_000_000.0,
        }
    }
}

fn default_database_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub advanced: AdvancedConfig,
    #[serde(default)]
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub category_limits: CategoryLimits,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl AppConfig {
    /// Config path from the CLI flag, else the environment, else the default.
    pub fn resolve_path(cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Parse and validate. Environment overrides are not applied.
    pub fn from_json_str(json: &str) -> Result<Self, DomainError> {
        let config: AppConfig = serde_json::from_str(json)
            .map_err(|e| DomainError::Configuration(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, apply environment overrides, validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config: AppConfig = serde_json::from_str(&raw)
            .map_err(|e| DomainError::Configuration(format!("invalid config JSON: {e}")))?;
        config.apply_overrides(
            std::env::var(WEBHOOK_ENV).ok(),
            std::env::var(DB_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, webhook_url: Option<String>, database_path: Option<String>) {
        if let Some(url) = webhook_url.filter(|u| !u.trim().is_empty()) {
            self.notifications.webhook_url = Some(url);
        }
        if let Some(path) = database_path.filter(|p| !p.trim().is_empty()) {
            self.database_path = path;
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let s = &self.strategy;
        if !(s.monthly_regular_amount.is_finite() && s.monthly_regular_amount > 0.0) {
            return Err(DomainError::Configuration(
                "strategy.monthly_regular_amount must be > 0".into(),
            ));
        }
        if !(s.dip_buy_amount.is_finite() && s.dip_buy_amount > 0.0) {
            return Err(DomainError::Configuration(
                "strategy.dip_buy_amount must be > 0".into(),
            ));
        }
        if !(s.dip_threshold.is_finite() && s.dip_threshold <= 0.0) {
            return Err(DomainError::Configuration(
                "strategy.dip_threshold must be <= 0".into(),
            ));
        }
        let delay = self.advanced.api_delay_seconds;
        if !(delay.is_finite() && (0.0..=MAX_API_DELAY_SECONDS).contains(&delay)) {
            return Err(DomainError::Configuration(format!(
                "advanced.api_delay_seconds must be in [0, {MAX_API_DELAY_SECONDS}], got {delay}"
            )));
        }

        let mut seen = HashSet::new();
        for instrument in &self.instruments {
            instrument.validate()?;
            if !seen.insert(instrument.code.as_str()) {
                return Err(DomainError::Configuration(format!(
                    "duplicate instrument code {}",
                    instrument.code
                )));
            }
        }
        enabled_universe(&self.instruments)?;

        for (category, limit) in &self.category_limits {
            let r = limit.max_allocation_ratio;
            if !(r > 0.0 && r <= 1.0) {
                return Err(DomainError::Configuration(format!(
                    "category_limits.{category}.max_allocation_ratio must be in (0, 1], got {r}"
                )));
            }
        }

        // Parses every time and checks buy_day.
        Scheduler::new(&self.schedule, s.buy_day)?;
        Ok(())
    }

    pub fn order_delay(&self) -> Result<Duration, DomainError> {
        Duration::try_from_secs_f64(self.advanced.api_delay_seconds).map_err(|e| {
            DomainError::Configuration(format!("advanced.api_delay_seconds: {e}"))
        })
    }

    pub fn enabled_instruments(&self) -> Result<Vec<Instrument>, DomainError> {
        enabled_universe(&self.instruments)
    }

    /// Enabled instrument count per category, for `check-config`.
    pub fn category_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for i in self.instruments.iter().filter(|i| i.enabled) {
            *counts.entry(i.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "strategy": { "monthly_regular_amount": 1000000, "dip_buy_amount": 500000, "buy_day": 15 },
        "instruments": [ { "code": "069500", "name": "KODEX 200" } ]
    }"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = AppConfig::from_json_str(MINIMAL).unwrap();
        assert_eq!(config.strategy.allocation_method, AllocationMethod::Equal);
        assert_eq!(config.strategy.dip_allocation_method, DipAllocationMethod::Focus);
        assert_eq!(config.strategy.dip_threshold, -5.0);
        assert!(!config.advanced.auto_trade);
        assert_eq!(config.order_delay().unwrap(), Duration::from_millis(500));
        assert_eq!(config.database_path, DEFAULT_DB_PATH);
        assert_eq!(config.instruments[0].priority, 999);
    }

    #[test]
    fn test_rejects_positive_threshold() {
        let json = MINIMAL.replace("\"buy_day\": 15", "\"buy_day\": 15, \"dip_threshold\": 3.0");
        assert!(AppConfig::from_json_str(&json).unwrap_err().is_configuration());
    }

    #[test]
    fn test_rejects_unknown_method() {
        let json = MINIMAL.replace("\"buy_day\": 15", "\"buy_day\": 15, \"allocation_method\": \"RANDOM\"");
        assert!(AppConfig::from_json_str(&json).unwrap_err().is_configuration());
    }

    #[test]
    fn test_overrides_replace_webhook_and_db() {
        let mut config = AppConfig::from_json_str(MINIMAL).unwrap();
        config.apply_overrides(Some("https://hooks.example/x".into()), Some("".into()));
        assert_eq!(
            config.notifications.webhook_url.as_deref(),
            Some("https://hooks.example/x")
        );
        assert_eq!(config.database_path, DEFAULT_DB_PATH);
    }
}
