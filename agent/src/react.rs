//! The reasoning loop.
//!
//! Each iteration asks the model for one decision, runs the chosen tool and
//! feeds the observation into the next prompt. A turn ends on a final
//! answer, a return-direct tool result, a repeated action, the iteration cap,
//! an undecodable reply or an unavailable model. A return-direct result that
//! is itself a [`RunOutcome`] ends the turn with that outcome's status.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use scholar_llm::{CompletionClient, CompletionRequest};
use scholar_protocol::AgentContext;
use scholar_store::TranscriptMessage;
use scholar_tools::{ToolExecutor, ToolRegistry, render_value};

use crate::config::AgentConfig;
use crate::decision::parse_decision;
use crate::events::{AgentEvent, EventSink};
use crate::prompt::{PromptBuilder, default_instructions};
use crate::state::{LoopPhase, LoopState, Step};

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
    LoopDetected,
    MaxIterationsReached,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::LoopDetected => "loop_detected",
            Self::MaxIterationsReached => "max_iterations_reached",
        };
        f.write_str(label)
    }
}

/// The result of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,

    /// The answer on success; the best partial result otherwise, if any.
    pub result: Option<Value>,

    /// One sentence for the user explaining the outcome.
    pub summary: String,

    pub steps: Vec<Step>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Text to show the user.
    pub fn message(&self) -> String {
        match (self.status, &self.result) {
            (RunStatus::Success, Some(answer)) => render_value(answer),
            (_, Some(partial)) => format!(
                "{}\n\nPartial result:\n{}",
                self.summary,
                render_value(partial)
            ),
            (_, None) => self.summary.clone(),
        }
    }
}

/// A ReAct-style controller over one tool registry.
pub struct ReasoningLoop {
    llm: Arc<dyn CompletionClient>,
    registry: ToolRegistry,
    executor: ToolExecutor,
    prompt: PromptBuilder,
    config: AgentConfig,
}

impl ReasoningLoop {
    pub fn new(llm: Arc<dyn CompletionClient>, registry: ToolRegistry) -> Self {
        Self {
            llm,
            registry,
            executor: ToolExecutor::new(),
            prompt: PromptBuilder::new(default_instructions()),
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.prompt = PromptBuilder::new(instructions);
        self
    }

    pub fn with_executor(mut self, executor: ToolExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one turn.
    pub async fn run(&self, message: &str, context: &AgentContext) -> RunOutcome {
        self.drive(message, context, &[], &EventSink::default()).await
    }

    /// Run one turn with earlier conversation messages in the prompt.
    pub async fn run_with_history(
        &self,
        message: &str,
        context: &AgentContext,
        history: &[TranscriptMessage],
    ) -> RunOutcome {
        self.drive(message, context, history, &EventSink::default()).await
    }

    /// Run one turn on a background task, streaming its progress. The stream
    /// ends after [`AgentEvent::MessageEnd`].
    pub fn run_streaming(
        self: Arc<Self>,
        message: impl Into<String>,
        context: AgentContext,
        history: Vec<TranscriptMessage>,
    ) -> UnboundedReceiverStream<AgentEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let message = message.into();
        tokio::spawn(async move {
            let events = EventSink::new(sender);
            self.drive(&message, &context, &history, &events).await;
        });
        UnboundedReceiverStream::new(receiver)
    }

    async fn drive(
        &self,
        message: &str,
        context: &AgentContext,
        history: &[TranscriptMessage],
        events: &EventSink,
    ) -> RunOutcome {
        let history = &history[history.len().saturating_sub(self.config.history_messages)..];
        let system_prompt = self.prompt.system_prompt(context);
        let mut state = LoopState::new(self.config.max_iterations);
        info!(
            "Starting turn for user {} in {} scope with {} tools",
            context.user_id,
            context.scope,
            self.registry.len()
        );

        let outcome = loop {
            if state.at_cap() {
                let partial = state.best_partial();
                let mut summary = format!(
                    "I couldn't find an answer within {} steps.",
                    self.config.max_iterations
                );
                if partial.is_some() {
                    summary.push_str(" The last tool result is included as a partial answer.");
                }
                break finish(state, RunStatus::MaxIterationsReached, partial, summary);
            }

            state.transition(LoopPhase::Thinking);
            events.emit(AgentEvent::Status {
                iteration: state.iteration_count() + 1,
                message: "thinking".to_string(),
            });

            let request = CompletionRequest::new(self.prompt.build(
                &self.registry,
                history,
                state.steps(),
                message,
            ))
            .with_system_prompt(system_prompt.clone())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

            let reply = match self.llm.complete(&request).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Completion failed, ending turn: {e}");
                    let summary = format!(
                        "The language model is unavailable right now, so no answer could be \
                         produced ({e})."
                    );
                    break finish(state, RunStatus::Failed, None, summary);
                }
            };

            let decision = match parse_decision(&reply) {
                Ok(decision) => decision,
                Err(e) => {
                    warn!("Undecodable model reply: {e}");
                    debug!("Reply was: {reply}");
                    let summary = format!(
                        "The model's reply could not be understood ({e}), so I stopped rather \
                         than guess."
                    );
                    break finish(state, RunStatus::Failed, None, summary);
                }
            };

            if decision.is_final() {
                let calls = state.iteration_count();
                let summary = format!(
                    "Answered after {calls} tool {}.",
                    if calls == 1 { "call" } else { "calls" }
                );
                break finish(
                    state,
                    RunStatus::Success,
                    Some(decision.action_input),
                    summary,
                );
            }

            if !state.remember(&decision.action, &decision.action_input) {
                warn!("Model repeated {} with identical input", decision.action);
                let partial = state.best_partial();
                let summary = format!(
                    "I got stuck repeating `{}` with the same input and stopped.",
                    decision.action
                );
                break finish(state, RunStatus::LoopDetected, partial, summary);
            }

            state.transition(LoopPhase::Acting);
            events.emit(AgentEvent::ToolStart {
                tool: decision.action.clone(),
                input: decision.action_input.clone(),
            });
            let started = Instant::now();
            let observation = self
                .executor
                .execute(
                    &self.registry,
                    &decision.action,
                    &decision.action_input,
                    context,
                )
                .await;
            events.emit(AgentEvent::ToolEnd {
                tool: decision.action.clone(),
                kind: observation.kind,
                cache_hit: observation.cache_hit,
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            });
            state.transition(LoopPhase::Observing);

            let direct = (observation.is_success() && observation.return_direct)
                .then(|| observation.value.clone().unwrap_or(Value::Null));
            let action = decision.action.clone();
            state.push(Step {
                thought: decision.thought,
                action: decision.action,
                action_input: decision.action_input,
                observation,
            });

            if let Some(value) = direct {
                // A nested loop hands back its whole outcome.
                break match serde_json::from_value::<RunOutcome>(value.clone()) {
                    Ok(nested) => finish(state, nested.status, nested.result, nested.summary),
                    Err(_) => {
                        let summary = format!("Returned the result of `{action}` directly.");
                        finish(state, RunStatus::Success, Some(value), summary)
                    }
                };
            }
        };

        events.emit(AgentEvent::Message {
            content: outcome.message(),
        });
        events.emit(AgentEvent::MessageEnd {
            outcome: outcome.clone(),
        });
        outcome
    }
}

fn finish(
    mut state: LoopState,
    status: RunStatus,
    result: Option<Value>,
    summary: String,
) -> RunOutcome {
    state.transition(if status == RunStatus::Success {
        LoopPhase::Done
    } else {
        LoopPhase::Failed
    });
    info!(
        "Turn ended with {status} after {} steps",
        state.iteration_count()
    );
    RunOutcome {
        status,
        result,
        summary,
        steps: state.into_steps(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scholar_llm::ScriptedClient;
    use scholar_tools::{ObservationKind, Tool, ToolOutput, ToolSpec};
    use serde_json::json;

    fn direct_tool() -> Tool {
        Tool::from_fn("handoff", "Hands off.", ToolSpec::new(), |_, _| async {
            Ok(ToolOutput::direct("from the specialist"))
        })
    }

    #[tokio::test]
    async fn test_return_direct_ends_the_turn() {
        let llm = Arc::new(ScriptedClient::new([r#"{"action": "handoff", "action_input": {}}"#]));
        let registry = ToolRegistry::from_tools([direct_tool()]).unwrap();
        let agent = ReasoningLoop::new(llm.clone(), registry);

        let outcome = agent.run("go", &AgentContext::library(1)).await;

        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(outcome.result, Some(json!("from the specialist")));
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(llm.calls().await, 1);
    }

    #[tokio::test]
    async fn test_nested_outcome_keeps_its_status() {
        let nested = RunOutcome {
            status: RunStatus::LoopDetected,
            result: Some(json!({"hits": 2})),
            summary: "I got stuck repeating `semantic_search` with the same input and stopped."
                .to_string(),
            steps: Vec::new(),
        };
        let value = serde_json::to_value(&nested).unwrap();
        let handoff = Tool::from_fn("handoff", "Hands off.", ToolSpec::new(), move |_, _| {
            let value = value.clone();
            async move { Ok(ToolOutput::direct(value)) }
        });
        let llm = Arc::new(ScriptedClient::new([r#"{"action": "handoff", "action_input": {}}"#]));
        let agent = ReasoningLoop::new(llm, ToolRegistry::from_tools([handoff]).unwrap());

        let outcome = agent.run("go", &AgentContext::library(1)).await;

        assert_eq!(outcome.status, RunStatus::LoopDetected);
        assert_eq!(outcome.result, nested.result);
        assert_eq!(outcome.summary, nested.summary);
        assert_eq!(outcome.steps.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_observation() {
        let llm = Arc::new(ScriptedClient::new([
            r#"{"action": "nonexistent", "action_input": {}}"#,
            r#"{"action": "Final Answer", "action_input": "gave up on it"}"#,
        ]));
        let agent = ReasoningLoop::new(llm.clone(), ToolRegistry::new());

        let outcome = agent.run("go", &AgentContext::library(1)).await;

        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(outcome.steps[0].observation.kind, ObservationKind::UnknownTool);
        let second_prompt = llm.requests().await[1].prompt.clone();
        assert!(second_prompt.contains("Unknown tool `nonexistent`"));
    }

    #[tokio::test]
    async fn test_history_is_trimmed() {
        let llm = Arc::new(ScriptedClient::new([
            r#"{"action": "Final Answer", "action_input": "ok"}"#,
        ]));
        let agent = ReasoningLoop::new(llm.clone(), ToolRegistry::new()).with_config(AgentConfig {
            history_messages: 1,
            ..AgentConfig::default()
        });
        let history = [
            TranscriptMessage::new(scholar_store::Role::User, "oldest"),
            TranscriptMessage::new(scholar_store::Role::Assistant, "newest"),
        ];

        agent
            .run_with_history("go", &AgentContext::library(1), &history)
            .await;

        let prompt = llm.requests().await[0].prompt.clone();
        assert!(prompt.contains("Assistant: newest"));
        assert!(!prompt.contains("oldest"));
    }

    #[test]
    fn test_message_prefers_answer_then_partial() {
        let mut outcome = RunOutcome {
            status: RunStatus::Success,
            result: Some(json!("42")),
            summary: "Answered after 0 tool calls.".to_string(),
            steps: Vec::new(),
        };
        assert_eq!(outcome.message(), "42");

        outcome.status = RunStatus::MaxIterationsReached;
        outcome.summary = "Out of steps.".to_string();
        assert_eq!(outcome.message(), "Out of steps.\n\nPartial result:\n42");

        outcome.result = None;
        assert_eq!(outcome.message(), "Out of steps.");
    }
}
