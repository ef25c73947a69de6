//! Progress events for streaming callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use scholar_tools::ObservationKind;

use crate::react::RunOutcome;

/// Ordered progress of one turn. The last event is always
/// [`AgentEvent::MessageEnd`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// The loop is about to ask the model for its next decision.
    Status { iteration: usize, message: String },

    /// A tool is about to run.
    ToolStart { tool: String, input: Value },

    /// A tool finished.
    ToolEnd {
        tool: String,
        kind: ObservationKind,
        cache_hit: bool,
        duration_ms: u64,
    },

    /// The text shown to the user: the answer, or the reason there is none.
    Message { content: String },

    /// The turn's outcome, identical to what `run` returns.
    MessageEnd { outcome: RunOutcome },
}

/// Where a loop sends its events. Sending never blocks and a dropped
/// receiver is ignored.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    sender: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl EventSink {
    pub(crate) fn new(sender: mpsc::UnboundedSender<AgentEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub(crate) fn emit(&self, event: AgentEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
