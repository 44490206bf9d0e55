use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Priority assigned to instruments that do not declare one. Sorts last.
pub const DEFAULT_PRIORITY: i64 = 999;

/// Category assigned to instruments that do not declare one.
pub const DEFAULT_CATEGORY: &str = "UNKNOWN";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_weight() -> f64 {
    1.0
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

fn default_enabled() -> bool {
    true
}

/// Reference data for one exchange-traded fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub code: String,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub custom_ratio: Option<f64>,
    /// Lower sorts first.
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Instrument {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            category: default_category(),
            weight: default_weight(),
            custom_ratio: None,
            priority: DEFAULT_PRIORITY,
            enabled: true,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_custom_ratio(mut self, ratio: f64) -> Self {
        self.custom_ratio = Some(ratio);
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.code.trim().is_empty() {
            return Err(DomainError::Configuration("instrument code must not be empty".into()));
        }
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(DomainError::Configuration(format!(
                "instrument {} has non-positive weight {}",
                self.code, self.weight
            )));
        }
        if let Some(ratio) = self.custom_ratio {
            if !(ratio.is_finite() && ratio >= 0.0) {
                return Err(DomainError::Configuration(format!(
                    "instrument {} has invalid custom_ratio {ratio}",
                    self.code
                )));
            }
        }
        Ok(())
    }
}

/// Keep only enabled instruments, in declaration order.
/// Fails with [`DomainError::EmptyUniverse`] when nothing remains.
pub fn enabled_universe(instruments: &[Instrument]) -> Result<Vec<Instrument>, DomainError> {
    let universe: Vec<Instrument> = instruments.iter().filter(|i| i.enabled).cloned().collect();
    if universe.is_empty() {
        return Err(DomainError::EmptyUniverse);
    }
    Ok(universe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let inst: Instrument =
            serde_json::from_str(r#"{"code": "133690", "name": "NASDAQ100"}"#).unwrap();
        assert_eq!(inst.category, "UNKNOWN");
        assert_eq!(inst.weight, 1.0);
        assert_eq!(inst.priority, DEFAULT_PRIORITY);
        assert!(inst.enabled);
        assert!(inst.custom_ratio.is_none());
    }

    #[test]
    fn test_enabled_universe_filters_and_keeps_order() {
        let instruments = vec![
            Instrument::new("A", "a"),
            Instrument::new("B", "b").disabled(),
            Instrument::new("C", "c"),
        ];
        let universe = enabled_universe(&instruments).unwrap();
        let codes: Vec<&str> = universe.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["A", "C"]);
    }

    #[test]
    fn test_enabled_universe_empty_fails() {
        let instruments = vec![Instrument::new("A", "a").disabled()];
        let err = enabled_universe(&instruments).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_validate_rejects_zero_weight() {
        assert!(Instrument::new("A", "a").with_weight(0.0).validate().is_err());
        assert!(Instrument::new("", "a").validate().is_err());
        assert!(Instrument::new("A", "a").validate().is_ok());
    }
}
