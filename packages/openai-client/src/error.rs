//! Error types for OpenAI client.

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// OpenAI client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {message}")]
    Network { message: String, retryable: bool },

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl OpenAIError {
    /// Whether a retry with backoff has any chance of succeeding.
    ///
    /// Rate limits (429), request timeouts (408), and server-side failures
    /// (5xx) are transient; everything else is treated as permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            OpenAIError::Network { retryable, .. } => *retryable,
            OpenAIError::Api { status, .. } => {
                *status == 429 || *status == 408 || *status >= 500
            }
            OpenAIError::Config(_) | OpenAIError::Parse(_) => false,
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        OpenAIError::Network {
            retryable: e.is_timeout() || e.is_connect(),
            message: e.to_string(),
        }
    }
}
