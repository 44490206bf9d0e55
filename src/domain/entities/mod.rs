pub mod holding;
pub mod instrument;
pub mod trade;
