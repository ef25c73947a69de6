//! Embedding errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// No credentials for a provider that needs them.
    #[error("{0} embeddings are not configured: missing API key")]
    NotConfigured(&'static str),

    #[error("embedding provider rate limited the request (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Non-success HTTP status.
    #[error("embedding API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider answered but the body was unusable.
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    /// Two vectors that should share a model do not.
    #[error("vector dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("embedding transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// True when the service could not produce a vector right now. A
    /// dimension mismatch is a data problem instead.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, Self::DimensionMismatch { .. })
    }
}
