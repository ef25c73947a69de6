//! Error types for the retrieval engine.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval engine.
///
/// An empty scope is not an error; it yields an empty outcome.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The query could not be embedded.
    #[error("embedding error: {0}")]
    Embedding(#[from] scholar_embeddings::EmbeddingError),

    /// The chunk store could not be read.
    #[error("store error: {0}")]
    Store(#[from] scholar_store::StoreError),
}

impl RetrievalError {
    /// Whether a collaborator service was unreachable, as opposed to the data
    /// being inconsistent.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Embedding(e) => e.is_unavailable(),
            Self::Store(e) => matches!(
                e,
                scholar_store::StoreError::Unavailable(_) | scholar_store::StoreError::Io(_)
            ),
        }
    }
}
