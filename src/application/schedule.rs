//! Calendar gating and the job scheduler driven by the run loop.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// How long after its slot time a daily job may still fire. Stops a
/// restart at 15:00 from replaying the 09:00 jobs.
const CATCH_UP_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    RefreshReferenceHighs,
    MorningReport,
    RegularBuy,
    DipCheck,
    WeeklySummary,
    MonthlySummary,
    PortfolioUpdate,
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Job::RefreshReferenceHighs => "refresh_reference_highs",
            Job::MorningReport => "morning_report",
            Job::RegularBuy => "regular_buy",
            Job::DipCheck => "dip_check",
            Job::WeeklySummary => "weekly_summary",
            Job::MonthlySummary => "monthly_summary",
            Job::PortfolioUpdate => "portfolio_update",
        };
        write!(f, "{s}")
    }
}

/// Wall-clock times as "HH:MM" in local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub reference_high_refresh: String,
    pub morning_report: String,
    pub regular_buy_check: String,
    pub weekly_summary: String,
    /// After the close, once the day's fills have settled.
    pub portfolio_update: String,
    pub dip_check_interval_minutes: u32,
    pub market_open: String,
    pub market_close: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reference_high_refresh: "08:55".into(),
            morning_report: "09:00".into(),
            regular_buy_check: "09:05".into(),
            weekly_summary: "09:00".into(),
            portfolio_update: "15:35".into(),
            dip_check_interval_minutes: 30,
            market_open: "09:00".into(),
            market_close: "15:30".into(),
        }
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| {
        DomainError::Configuration(format!("schedule.{field}: expected HH:MM, got {value:?} ({e})"))
    })
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Regular buys happen on weekdays whose day-of-month equals `buy_day`.
pub fn is_buy_day(date: NaiveDate, buy_day: u32) -> bool {
    is_weekday(date) && date.day() == buy_day
}

/// Parsed schedule plus per-slot firing memory.
#[derive(Debug, Clone)]
pub struct Scheduler {
    refresh_at: NaiveTime,
    morning_at: NaiveTime,
    regular_at: NaiveTime,
    weekly_at: NaiveTime,
    portfolio_at: NaiveTime,
    market_open: NaiveTime,
    market_close: NaiveTime,
    dip_interval: Duration,
    buy_day: u32,
    fired: Vec<(Job, NaiveDate)>,
    last_dip_slot: Option<(NaiveDate, i64)>,
}

impl Scheduler {
    pub fn new(config: &ScheduleConfig, buy_day: u32) -> Result<Self, DomainError> {
        if config.dip_check_interval_minutes == 0 {
            return Err(DomainError::Configuration(
                "schedule.dip_check_interval_minutes must be > 0".into(),
            ));
        }
        if !(1..=31).contains(&buy_day) {
            return Err(DomainError::Configuration(format!(
                "buy_day must be in 1..=31, got {buy_day}"
            )));
        }
        let market_open = parse_time("market_open", &config.market_open)?;
        let market_close = parse_time("market_close", &config.market_close)?;
        if market_close <= market_open {
            return Err(DomainError::Configuration(
                "schedule.market_close must be after market_open".into(),
            ));
        }

        Ok(Self {
            refresh_at: parse_time("reference_high_refresh", &config.reference_high_refresh)?,
            morning_at: parse_time("morning_report", &config.morning_report)?,
            regular_at: parse_time("regular_buy_check", &config.regular_buy_check)?,
            weekly_at: parse_time("weekly_summary", &config.weekly_summary)?,
            portfolio_at: parse_time("portfolio_update", &config.portfolio_update)?,
            market_open,
            market_close,
            dip_interval: Duration::minutes(i64::from(config.dip_check_interval_minutes)),
            buy_day,
            fired: Vec::new(),
            last_dip_slot: None,
        })
    }

    pub fn in_market_hours(&self, time: NaiveTime) -> bool {
        time >= self.market_open && time < self.market_close
    }

    /// Jobs due at `now`. Each job fires at most once per slot: daily jobs
    /// once per date, the dip check once per interval.
    pub fn due(&mut self, now: NaiveDateTime) -> Vec<Job> {
        let date = now.date();
        let time = now.time();
        let weekday = is_weekday(date);
        let mut jobs = Vec::new();

        if weekday {
            self.daily(&mut jobs, Job::RefreshReferenceHighs, self.refresh_at, date, time);
            self.daily(&mut jobs, Job::MorningReport, self.morning_at, date, time);
            if date.day() == self.buy_day {
                self.daily(&mut jobs, Job::RegularBuy, self.regular_at, date, time);
            }
            if let Some(slot) = self.dip_slot(time) {
                if self.last_dip_slot != Some((date, slot)) {
                    self.last_dip_slot = Some((date, slot));
                    jobs.push(Job::DipCheck);
                }
            }
            self.daily(&mut jobs, Job::PortfolioUpdate, self.portfolio_at, date, time);
        }
        if date.weekday() == Weekday::Mon {
            self.daily(&mut jobs, Job::WeeklySummary, self.weekly_at, date, time);
        }
        if date.day() == 1 {
            self.daily(&mut jobs, Job::MonthlySummary, self.morning_at, date, time);
        }

        jobs
    }

    fn daily(
        &mut self,
        jobs: &mut Vec<Job>,
        job: Job,
        at: NaiveTime,
        date: NaiveDate,
        time: NaiveTime,
    ) {
        let elapsed = time - at;
        if elapsed < Duration::zero() || elapsed >= Duration::minutes(CATCH_UP_MINUTES) {
            return;
        }
        if self.fired.iter().any(|(j, d)| *j == job && *d == date) {
            return;
        }
        self.fired.retain(|(j, _)| *j != job);
        self.fired.push((job, date));
        jobs.push(job);
    }

    fn dip_slot(&self, time: NaiveTime) -> Option<i64> {
        if !self.in_market_hours(time) {
            return None;
        }
        let since_open = time - self.market_open;
        Some(since_open.num_minutes() / self.dip_interval.num_minutes())
    }
}
