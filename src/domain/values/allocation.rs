//! Allocation vocabulary: buy modes, allocation methods and the per-instrument
//! money split produced by the allocation engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

/// Which buy cycle produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuyMode {
    Regular,
    Dip,
}

impl fmt::Display for BuyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuyMode::Regular => write!(f, "REGULAR"),
            BuyMode::Dip => write!(f, "DIP"),
        }
    }
}

impl FromStr for BuyMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "REGULAR" => Ok(BuyMode::Regular),
            "DIP" => Ok(BuyMode::Dip),
            _ => Err(DomainError::Configuration(format!("Unknown buy mode: {s}"))),
        }
    }
}

/// Allocation method for regular buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AllocationMethod {
    Equal,
    Weighted,
    Custom,
}

impl fmt::Display for AllocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationMethod::Equal => write!(f, "EQUAL"),
            AllocationMethod::Weighted => write!(f, "WEIGHTED"),
            AllocationMethod::Custom => write!(f, "CUSTOM"),
        }
    }
}

impl FromStr for AllocationMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EQUAL" => Ok(AllocationMethod::Equal),
            "WEIGHTED" => Ok(AllocationMethod::Weighted),
            "CUSTOM" => Ok(AllocationMethod::Custom),
            _ => Err(DomainError::Configuration(format!(
                "Unknown allocation method: {s}"
            ))),
        }
    }
}

impl TryFrom<String> for AllocationMethod {
    type Error = DomainError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AllocationMethod> for String {
    fn from(m: AllocationMethod) -> Self {
        m.to_string()
    }
}

/// Allocation method for dip buys. Every variant reuses a regular primitive
/// over the universe the caller has already narrowed to flagged instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DipAllocationMethod {
    /// Split evenly across the flagged instruments only.
    Focus,
    Equal,
    Weighted,
}

impl DipAllocationMethod {
    /// The regular primitive this dip method delegates to.
    pub fn primitive(self) -> AllocationMethod {
        match self {
            DipAllocationMethod::Focus | DipAllocationMethod::Equal => AllocationMethod::Equal,
            DipAllocationMethod::Weighted => AllocationMethod::Weighted,
        }
    }
}

impl fmt::Display for DipAllocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DipAllocationMethod::Focus => write!(f, "FOCUS"),
            DipAllocationMethod::Equal => write!(f, "EQUAL"),
            DipAllocationMethod::Weighted => write!(f, "WEIGHTED"),
        }
    }
}

impl FromStr for DipAllocationMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FOCUS" => Ok(DipAllocationMethod::Focus),
            "EQUAL" => Ok(DipAllocationMethod::Equal),
            "WEIGHTED" => Ok(DipAllocationMethod::Weighted),
            _ => Err(DomainError::Configuration(format!(
                "Unknown dip allocation method: {s}"
            ))),
        }
    }
}

impl TryFrom<String> for DipAllocationMethod {
    type Error = DomainError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DipAllocationMethod> for String {
    fn from(m: DipAllocationMethod) -> Self {
        m.to_string()
    }
}

/// How leftover cash is handed out after whole-unit truncation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RedistributionPolicy {
    /// Walk the priority list once and stop at the first instrument the
    /// remainder cannot buy a unit of.
    #[default]
    StopAtFirst,
    /// Walk the priority list once, passing over instruments the remainder
    /// cannot afford.
    SkipUnaffordable,
}

impl fmt::Display for RedistributionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedistributionPolicy::StopAtFirst => write!(f, "STOP_AT_FIRST"),
            RedistributionPolicy::SkipUnaffordable => write!(f, "SKIP_UNAFFORDABLE"),
        }
    }
}

impl FromStr for RedistributionPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STOP_AT_FIRST" => Ok(RedistributionPolicy::StopAtFirst),
            "SKIP_UNAFFORDABLE" => Ok(RedistributionPolicy::SkipUnaffordable),
            _ => Err(DomainError::Configuration(format!(
                "Unknown redistribution policy: {s}"
            ))),
        }
    }
}

impl TryFrom<String> for RedistributionPolicy {
    type Error = DomainError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RedistributionPolicy> for String {
    fn from(p: RedistributionPolicy) -> Self {
        p.to_string()
    }
}

/// Cap on the fraction of a cycle's cash one category may receive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryLimit {
    pub max_allocation_ratio: f64,
}

/// Category name -> limit.
pub type CategoryLimits = HashMap<String, CategoryLimit>;

/// Money assigned to one instrument for one buy cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub code: String,
    pub name: String,
    pub category: String,
    pub allocated_amount: f64,
    /// Fraction of the cycle total.
    pub ratio: f64,
    pub priority: i64,
}
