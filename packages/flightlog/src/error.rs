//! Typed errors for the flightlog library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during flightlog operations.
#[derive(Debug, Error)]
pub enum FlightLogError {
    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Insert hit the identity-key uniqueness constraint
    #[error("record already exists")]
    DuplicateRecord,

    /// Extraction backend call failed
    #[error("extraction error: {0}")]
    Extraction(#[source] BackendError),

    /// Chat backend call failed (never retried for a chat turn)
    #[error("chat error: {0}")]
    Chat(#[source] BackendError),

    /// Model requested a tool outside the fixed catalogue
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Known tool, arguments failed schema validation
    #[error("invalid arguments for tool {tool}: {message}")]
    ToolArguments { tool: String, message: String },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// A model/transport failure at a backend seam, classified for the
/// scan pipeline's retry wrapper.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    pub retryable: bool,
}

impl BackendError {
    /// A transient failure worth retrying with backoff.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A permanent failure; retrying cannot help.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Result type alias for flightlog operations.
pub type Result<T> = std::result::Result<T, FlightLogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_classification() {
        assert!(BackendError::retryable("rate limited").is_retryable());
        assert!(!BackendError::permanent("bad API key").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = FlightLogError::UnknownTool("telepathy".into());
        assert_eq!(err.to_string(), "unknown tool: telepathy");

        let err = FlightLogError::ToolArguments {
            tool: "flights_by_airport".into(),
            message: "missing field `airport`".into(),
        };
        assert!(err.to_string().contains("flights_by_airport"));
    }
}
