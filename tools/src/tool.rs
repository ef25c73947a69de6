//! Core tool types.
//!
//! A tool is a named, described operation the reasoning loop can call. The
//! handler receives the model's arguments (with the turn's identity and scope
//! fields already written over them) plus the typed context.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use scholar_protocol::AgentContext;

use crate::error::Result;
use crate::spec::ToolSpec;

/// The value a handler produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub value: Value,

    /// The value came from the result cache.
    #[serde(default)]
    pub cache_hit: bool,

    /// End the turn with this value as the final result.
    #[serde(default)]
    pub return_direct: bool,
}

impl ToolOutput {
    /// A plain output.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            cache_hit: false,
            return_direct: false,
        }
    }

    /// An output that ends the turn.
    pub fn direct(value: impl Into<Value>) -> Self {
        Self {
            return_direct: true,
            ..Self::new(value)
        }
    }

    /// The value as observation text: strings verbatim, anything else as
    /// pretty JSON.
    pub fn text(&self) -> String {
        render_value(&self.value)
    }
}

/// Render a JSON value for the model.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Executes a tool call.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Map<String, Value>, context: &AgentContext) -> Result<ToolOutput>;
}

/// Adapts an async closure into a [`ToolHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>, AgentContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ToolOutput>> + Send,
{
    async fn call(&self, args: Map<String, Value>, context: &AgentContext) -> Result<ToolOutput> {
        (self.0)(args, context.clone()).await
    }
}

/// A registered tool. Immutable once built.
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub spec: ToolSpec,
    pub handler: Arc<dyn ToolHandler>,

    /// Overrides the executor's default timeout.
    pub timeout: Option<Duration>,
}

impl Tool {
    /// Create a new tool.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            spec,
            handler,
            timeout: None,
        }
    }

    /// Create a tool from an async closure.
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        spec: ToolSpec,
        f: F,
    ) -> Self
    where
        F: Fn(Map<String, Value>, AgentContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput>> + Send + 'static,
    {
        Self::new(name, description, spec, Arc::new(FnHandler(f)))
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Catalogue entry for the prompt.
    pub fn render(&self) -> String {
        format!(
            "- {}: {}\n  Parameters:\n{}",
            self.name,
            self.description,
            self.spec.render()
        )
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("spec", &self.spec)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{DataType, ToolParam};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_from_fn_handler() {
        let tool = Tool::from_fn("echo", "Echo", ToolSpec::new(), |args, ctx| async move {
            Ok(ToolOutput::new(json!({"args": args, "user": ctx.user_id})))
        });

        let mut args = Map::new();
        args.insert("a".to_string(), json!(1));
        let out = tool
            .handler
            .call(args, &AgentContext::library(9))
            .await
            .unwrap();

        assert_eq!(out.value, json!({"args": {"a": 1}, "user": 9}));
        assert!(!out.cache_hit);
    }

    #[test]
    fn test_render() {
        let tool = Tool::from_fn(
            "list_papers",
            "List papers in scope.",
            ToolSpec::new().with_param(ToolParam::optional("limit", DataType::Integer, "Max.")),
            |_, _| async { Ok(ToolOutput::new("ok")) },
        );
        assert_eq!(
            tool.render(),
            "- list_papers: List papers in scope.\n  Parameters:\n    - limit (integer, optional): Max."
        );
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(ToolOutput::new("plain").text(), "plain");
        assert_eq!(ToolOutput::new(json!({"a": 1})).text(), "{\n  \"a\": 1\n}");
    }
}
