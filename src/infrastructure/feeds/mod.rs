//! Quote providers.

pub mod yahoo;
