//! Error types for tools.

use thiserror::Error;

/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors that can occur while registering or running tools.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Tool or record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A tool with this name is already registered.
    #[error("tool already exists: {0}")]
    AlreadyExists(String),

    /// Arguments did not match the parameter schema.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The handler ran and failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A service the tool depends on could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The handler did not finish within its timeout.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<scholar_retrieval::RetrievalError> for ToolError {
    fn from(e: scholar_retrieval::RetrievalError) -> Self {
        if e.is_unavailable() {
            Self::Unavailable(format!("search is unavailable: {e}"))
        } else {
            Self::ExecutionFailed(e.to_string())
        }
    }
}

impl From<scholar_store::StoreError> for ToolError {
    fn from(e: scholar_store::StoreError) -> Self {
        use scholar_store::StoreError;
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Unavailable(_) | StoreError::Io(_) => Self::Unavailable(e.to_string()),
            other => Self::ExecutionFailed(other.to_string()),
        }
    }
}

impl From<scholar_llm::LlmError> for ToolError {
    fn from(e: scholar_llm::LlmError) -> Self {
        Self::Unavailable(format!("language model is unavailable: {e}"))
    }
}
