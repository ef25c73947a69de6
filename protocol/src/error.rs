//! Error types for the shared contracts.

use thiserror::Error;

/// Errors raised while parsing protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Unknown retrieval scope name.
    #[error("unknown scope: {0}")]
    UnknownScope(String),
}
