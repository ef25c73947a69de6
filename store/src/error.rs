//! Error types for the collaborator stores.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A line of a JSONL file could not be decoded.
    #[error("invalid record at {path}:{line}: {source}")]
    InvalidRecord {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The backing service could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
