pub mod allocation;
pub mod buy_order;
pub mod decision;
pub mod dip;
pub mod portfolio;
