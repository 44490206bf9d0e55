pub mod allocation;
pub mod dip_detector;
pub mod execution;
pub mod portfolio;
pub mod quantity;
pub mod schedule;
pub mod snapshot;
pub mod trade_summary;
