//! Configuration for reasoning loops and the router.

use serde::{Deserialize, Serialize};

/// Configuration for one reasoning loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Tool steps allowed per turn.
    pub max_iterations: usize,

    /// Sampling temperature for decisions.
    pub temperature: f32,

    /// Completion budget per decision.
    pub max_tokens: u32,

    /// Prior transcript messages included in the prompt.
    pub history_messages: usize,
}

impl AgentConfig {
    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            temperature: 0.1,
            max_tokens: 1024,
            history_messages: 6,
        }
    }
}

/// Configuration for the router and the specialists it delegates to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Tool steps the router may take before giving up.
    pub max_iterations: usize,

    /// Passages returned by the router's quick search.
    pub search_top_k: usize,

    /// Passages returned by a specialist's search.
    pub specialist_top_k: usize,

    /// Loop settings for specialists.
    pub specialist: AgentConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            search_top_k: 3,
            specialist_top_k: 8,
            specialist: AgentConfig::default(),
        }
    }
}
