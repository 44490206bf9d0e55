use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: no enabled instruments in universe")]
    EmptyUniverse,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid price for {code}: {price}")]
    InvalidPrice { code: String, price: f64 },

    #[error("Price fetch failed for {code}: {reason}")]
    PriceFetch { code: String, reason: String },

    #[error("Order submission failed for {code}: {reason}")]
    OrderSubmission { code: String, reason: String },

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// True for errors that must be fixed in configuration before retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(self, DomainError::Configuration(_) | DomainError::EmptyUniverse)
    }
}

impl From<String> for DomainError {
    fn from(s: String) -> Self {
        DomainError::Database(s)
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Parse(e.to_string())
    }
}
