//! Error types for completion clients.

use thiserror::Error;

/// Result type alias for completion operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when requesting a completion.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Provider is missing a key or other required setting.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Rate limited by the provider.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The request did not finish in time.
    #[error("completion request timed out")]
    Timeout,

    /// Non-success status from the provider.
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout | Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::NotConfigured(_) | Self::InvalidResponse(_) | Self::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::Timeout.is_retryable());
        assert!(
            LlmError::Api {
                status: 503,
                message: "overloaded".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::Api {
                status: 400,
                message: "bad request".to_string()
            }
            .is_retryable()
        );
        assert!(!LlmError::NotConfigured("key".to_string()).is_retryable());
    }
}
