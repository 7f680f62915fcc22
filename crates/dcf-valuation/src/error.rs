//! Error types for valuation operations

use thiserror::Error;

/// Coarse classification of a failure, used to decide whether a retry makes sense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Provider asked us to slow down; worth waiting and retrying
    RateLimited,
    /// Requested series, statement row or value does not exist
    DataUnavailable,
    /// Network hiccup or server-side failure
    Transient,
    /// Anything else; retrying will not help
    Fatal,
}

/// Valuation specific errors
#[derive(Debug, Error)]
pub enum ValuationError {
    /// Rate limit exceeded for the data provider
    #[error("Rate limit exceeded for {provider}")]
    RateLimited {
        provider: String,
    },

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        symbol: String,
        reason: String,
    },

    /// A financial statement does not carry the requested line item
    #[error("Line item '{item}' not found in {statement} statement")]
    LineItemNotFound {
        statement: &'static str,
        item: &'static str,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider returned something we could not interpret
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ValuationError {
    /// Shorthand for a [`ValuationError::DataUnavailable`]
    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error for retry decisions
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::DataUnavailable { .. } | Self::LineItemNotFound { .. } => {
                ErrorKind::DataUnavailable
            }
            Self::Http(e) if e.status().is_some_and(|s| s.as_u16() == 429) => {
                ErrorKind::RateLimited
            }
            Self::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                ErrorKind::Transient
            }
            Self::Http(e) if e.status().is_some_and(|s| s.is_server_error()) => {
                ErrorKind::Transient
            }
            Self::Http(_)
            | Self::Json(_)
            | Self::Provider(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Csv(_) => ErrorKind::Fatal,
        }
    }

    /// Whether waiting and trying again may succeed
    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }
}

/// Result type alias for valuation operations
pub type Result<T> = std::result::Result<T, ValuationError>;
