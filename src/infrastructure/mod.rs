pub mod feeds;
pub mod notify;
pub mod paper;
pub mod sqlite;
