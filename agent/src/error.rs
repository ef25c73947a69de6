//! Error types for the agent.

use thiserror::Error;

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors raised while assembling or driving an agent.
///
/// A turn that goes wrong is not an error: it ends with a non-success
/// [`RunStatus`](crate::RunStatus). These cover setup and persistence.
#[derive(Error, Debug)]
pub enum AgentError {
    /// A tool registry could not be built.
    #[error("tool error: {0}")]
    Tool(#[from] scholar_tools::ToolError),

    /// The transcript log could not be read or written.
    #[error("transcript error: {0}")]
    Transcript(#[from] scholar_store::StoreError),
}
