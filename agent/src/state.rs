//! Working memory for one turn.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use scholar_tools::{Observation, digest};

/// Where the loop is within an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Thinking,
    Acting,
    Observing,
    Done,
    Failed,
}

/// One executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    pub action: String,
    pub action_input: Value,
    pub observation: Observation,
}

/// Per-turn state. Created by each run and dropped when it ends.
#[derive(Debug)]
pub struct LoopState {
    steps: Vec<Step>,
    max_iterations: usize,
    seen_fingerprints: HashSet<String>,
    phase: LoopPhase,
}

impl LoopState {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            steps: Vec::new(),
            max_iterations,
            seen_fingerprints: HashSet::new(),
            phase: LoopPhase::Thinking,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn transition(&mut self, phase: LoopPhase) {
        debug!("Loop phase {:?} -> {phase:?}", self.phase);
        self.phase = phase;
    }

    /// Steps completed so far.
    pub fn iteration_count(&self) -> usize {
        self.steps.len()
    }

    pub fn at_cap(&self) -> bool {
        self.steps.len() >= self.max_iterations
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    /// Record that `(action, input)` is about to run. Returns `false` if the
    /// same pair already ran in this turn.
    pub fn remember(&mut self, action: &str, input: &Value) -> bool {
        self.seen_fingerprints.insert(digest(action, input))
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// The value of the latest successful observation, if any.
    pub fn best_partial(&self) -> Option<Value> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.observation.is_success())
            .and_then(|s| s.observation.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scholar_tools::ObservationKind;
    use serde_json::json;

    fn step(kind: ObservationKind, value: Option<Value>) -> Step {
        Step {
            thought: None,
            action: "t".to_string(),
            action_input: json!({}),
            observation: Observation {
                kind,
                content: String::new(),
                value,
                cache_hit: false,
                return_direct: false,
            },
        }
    }

    #[test]
    fn test_fingerprints_ignore_key_order() {
        let mut state = LoopState::new(3);
        assert!(state.remember("search", &json!({"a": 1, "b": 2})));
        assert!(!state.remember("search", &json!({"b": 2, "a": 1})));
        assert!(state.remember("search", &json!({"a": 2, "b": 2})));
        assert!(state.remember("other", &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_best_partial_skips_failures() {
        let mut state = LoopState::new(3);
        assert_eq!(state.best_partial(), None);

        state.push(step(ObservationKind::Success, Some(json!("first"))));
        state.push(step(ObservationKind::ToolError, None));
        assert_eq!(state.best_partial(), Some(json!("first")));
        assert_eq!(state.iteration_count(), 2);
        assert!(!state.at_cap());

        state.push(step(ObservationKind::Success, Some(json!("second"))));
        assert_eq!(state.best_partial(), Some(json!("second")));
        assert!(state.at_cap());
    }
}
