pub mod brokerage;
pub mod notification_sink;
pub mod portfolio_store;
pub mod price_source;
pub mod trade_recorder;
