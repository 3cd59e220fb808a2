//! Error types for topology acquisition.

use core::error::Error;

use derive_more::Display;
use error_stack::Report;

/// Result type for status source operations.
pub type SourceResult<T> = Result<T, Report<SourceError>>;

/// Why a fetch cycle could not produce fresh nodes.
///
/// Every variant degrades the store the same way; the kind only shapes the
/// advisory message and the log line.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Transport failure, including timeouts
    #[display("network error: {message}")]
    Network { message: String },

    /// Non-success HTTP status
    #[display("HTTP error: {status}")]
    Http { status: u16 },

    /// Body did not have the expected shape
    #[display("invalid status response: {reason}")]
    Validation { reason: String },

    #[display("configuration error: {message}")]
    Configuration { message: String },
}

impl SourceError {
    pub fn validation(reason: impl Into<String>) -> Self {
        SourceError::Validation {
            reason: reason.into(),
        }
    }

    /// True for transport and HTTP status failures.
    pub fn is_network(&self) -> bool {
        matches!(self, SourceError::Network { .. } | SourceError::Http { .. })
    }
}

impl Error for SourceError {}

/// Cache read/write failures. Never leaves the cache module.
#[derive(Debug, Display)]
pub enum CacheError {
    #[display("cache I/O error: {message}")]
    Io { message: String },

    #[display("cache serialization error: {message}")]
    Serialization { message: String },
}

impl Error for CacheError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_display_formatting() {
        assert_eq!(
            SourceError::Network {
                message: "connection refused".into()
            }
            .to_string(),
            "network error: connection refused"
        );
        assert_eq!(SourceError::Http { status: 502 }.to_string(), "HTTP error: 502");
        assert_eq!(
            SourceError::validation("missing nodes array").to_string(),
            "invalid status response: missing nodes array"
        );
    }

    #[test]
    fn network_classification() {
        assert!(SourceError::Http { status: 500 }.is_network());
        assert!(!SourceError::validation("x").is_network());
    }
}
