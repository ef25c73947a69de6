//! Tool execution.
//!
//! The `ToolExecutor` turns one model action into one observation. It never
//! fails: unknown tools, bad arguments, handler errors and timeouts all come
//! back as observations the model can react to.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use scholar_protocol::AgentContext;

use crate::error::ToolError;
use crate::registry::ToolRegistry;
use crate::tool::Tool;

/// What happened when an action was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    /// The handler returned a value.
    Success,

    /// No tool has the requested name.
    UnknownTool,

    /// Arguments failed the parameter schema.
    InvalidInput,

    /// The handler failed or timed out.
    ToolError,

    /// A service behind the tool is down.
    Unavailable,
}

/// The result of one tool dispatch, as fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ObservationKind,

    /// Text shown to the model.
    pub content: String,

    /// The handler's value, on success.
    pub value: Option<Value>,

    pub cache_hit: bool,
    pub return_direct: bool,
}

impl Observation {
    fn failure(kind: ObservationKind, content: String) -> Self {
        Self {
            kind,
            content,
            value: None,
            cache_hit: false,
            return_direct: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == ObservationKind::Success
    }
}

/// Dispatches actions against a registry.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    default_timeout: Duration,
    max_observation_chars: usize,
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolExecutor {
    /// Create a new tool executor.
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            max_observation_chars: 6_000,
        }
    }

    /// Set the default timeout.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Cap the observation text shown to the model.
    pub fn with_max_observation_chars(mut self, max: usize) -> Self {
        self.max_observation_chars = max;
        self
    }

    /// Run `action` with `input`, scoped to `context`.
    pub async fn execute(
        &self,
        registry: &ToolRegistry,
        action: &str,
        input: &Value,
        context: &AgentContext,
    ) -> Observation {
        let Some(tool) = registry.get(action) else {
            warn!("Model requested unknown tool: {action}");
            return Observation::failure(
                ObservationKind::UnknownTool,
                format!(
                    "Unknown tool `{action}`. Available tools: {}.",
                    registry.names().join(", ")
                ),
            );
        };

        let mut args = match bind_arguments(tool, input) {
            Ok(args) => args,
            Err(problem) => return invalid_input(tool, &[problem]),
        };
        if let Err(problems) = tool.spec.validate(&args) {
            return invalid_input(tool, &problems);
        }
        context.apply_to(&mut args);

        let timeout = tool.timeout.unwrap_or(self.default_timeout);
        let start = Instant::now();
        debug!("Executing tool {} with {} arguments", tool.name, args.len());

        let result = tokio::time::timeout(timeout, tool.handler.call(args, context)).await;
        let duration_ms = start.elapsed().as_millis();

        match result {
            Ok(Ok(output)) => {
                info!(
                    "Tool {} succeeded in {duration_ms}ms (cache hit: {})",
                    tool.name, output.cache_hit
                );
                Observation {
                    kind: ObservationKind::Success,
                    content: self.truncate(output.text()),
                    value: Some(output.value),
                    cache_hit: output.cache_hit,
                    return_direct: output.return_direct,
                }
            }
            Ok(Err(ToolError::InvalidInput(message))) => invalid_input(tool, &[message]),
            Ok(Err(ToolError::Unavailable(message))) => {
                warn!("Tool {} unavailable: {message}", tool.name);
                Observation::failure(
                    ObservationKind::Unavailable,
                    format!(
                        "Tool `{}` is temporarily unavailable: {message}. This is a system \
                         problem, not an empty result.",
                        tool.name
                    ),
                )
            }
            Ok(Err(e)) => {
                warn!("Tool {} failed: {e}", tool.name);
                Observation::failure(
                    ObservationKind::ToolError,
                    format!("Tool `{}` failed: {e}", tool.name),
                )
            }
            Err(_) => {
                let e = ToolError::Timeout(timeout.as_secs());
                warn!("Tool {} {e}", tool.name);
                Observation::failure(
                    ObservationKind::ToolError,
                    format!("Tool `{}` failed: {e}", tool.name),
                )
            }
        }
    }

    fn truncate(&self, text: String) -> String {
        match text.char_indices().nth(self.max_observation_chars) {
            Some((cut, _)) => format!("{}\n... (truncated)", &text[..cut]),
            None => text,
        }
    }
}

/// Turn the model's `action_input` into an argument object. A bare string is
/// accepted for tools with a single required string parameter.
fn bind_arguments(tool: &Tool, input: &Value) -> Result<Map<String, Value>, String> {
    match input {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        Value::String(s) => match tool.spec.sole_string_param() {
            Some(name) => {
                let mut map = Map::new();
                map.insert(name.to_string(), Value::String(s.clone()));
                Ok(map)
            }
            None => Err("action_input must be a JSON object".to_string()),
        },
        _ => Err("action_input must be a JSON object".to_string()),
    }
}

fn invalid_input(tool: &Tool, problems: &[String]) -> Observation {
    debug!("Rejected arguments for {}: {problems:?}", tool.name);
    Observation::failure(
        ObservationKind::InvalidInput,
        format!(
            "Invalid arguments for `{}`: {}. Retry with corrected arguments.\nParameters:\n{}",
            tool.name,
            problems.join("; "),
            tool.spec.render()
        ),
    )
}
