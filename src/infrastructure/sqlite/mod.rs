pub mod migrations;
pub mod portfolio_repo;
pub mod trade_repo;

use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width timestamps so stored times sort and compare as text.
pub(crate) fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
