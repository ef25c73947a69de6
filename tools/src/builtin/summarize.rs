use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use scholar_llm::{CompletionClient, CompletionRequest};
use scholar_protocol::{AgentContext, PaperId};
use scholar_store::ChunkStore;

use super::{MAX_CONTEXT_CHARS, join_text, parse_args, scoped_paper_chunks};
use crate::error::Result;
use crate::spec::{DataType, ToolParam, ToolSpec};
use crate::tool::{Tool, ToolHandler, ToolOutput};

const SYSTEM_PROMPT: &str = "You summarise research papers for a researcher. Use only the \
     paper text provided. Be specific about methods, data and findings.";

/// Summarises one paper with the completion client.
pub struct SummarizePaper {
    chunks: Arc<dyn ChunkStore>,
    llm: Arc<dyn CompletionClient>,
}

#[derive(Deserialize)]
struct Params {
    paper_id: PaperId,
    focus: Option<String>,
}

impl SummarizePaper {
    pub fn tool(chunks: Arc<dyn ChunkStore>, llm: Arc<dyn CompletionClient>) -> Tool {
        let spec = ToolSpec::new()
            .with_param(ToolParam::required(
                "paper_id",
                DataType::Integer,
                "Id of the paper to summarise.",
            ))
            .with_param(ToolParam::optional(
                "focus",
                DataType::String,
                "Aspect to concentrate on, e.g. \"methodology\".",
            ));

        Tool::new(
            "summarize_paper",
            "Summarise a paper, optionally focusing on one aspect.",
            spec,
            Arc::new(Self { chunks, llm }),
        )
    }
}

#[async_trait]
impl ToolHandler for SummarizePaper {
    async fn call(&self, args: Map<String, Value>, context: &AgentContext) -> Result<ToolOutput> {
        let params: Params = parse_args(args)?;
        let chunks = scoped_paper_chunks(self.chunks.as_ref(), context, params.paper_id).await?;

        let mut prompt = String::from("Summarise the following paper");
        if let Some(focus) = params.focus.as_deref().filter(|f| !f.trim().is_empty()) {
            prompt.push_str(&format!(", focusing on {focus}"));
        }
        prompt.push_str(":\n\n");
        prompt.push_str(&join_text(&chunks, MAX_CONTEXT_CHARS));

        let request = CompletionRequest::new(prompt).with_system_prompt(SYSTEM_PROMPT);
        let summary = self.llm.complete(&request).await?;

        Ok(ToolOutput::new(json!({
            "paper_id": params.paper_id,
            "summary": summary.trim(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolError;
    use crate::builtin::testing;
    use pretty_assertions::assert_eq;
    use scholar_llm::{LlmError, ScriptedClient};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_summary_prompt_carries_paper_text_in_order() {
        let llm = Arc::new(ScriptedClient::new(["  A transformer study.  "]));
        let tool = SummarizePaper::tool(testing::store().await, llm.clone());

        let out = tool
            .handler
            .call(
                args(json!({"paper_id": 10, "focus": "methodology"})),
                &AgentContext::document(1, 10),
            )
            .await
            .unwrap();

        assert_eq!(out.value["summary"], json!("A transformer study."));
        let requests = llm.requests().await;
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0].prompt;
        assert!(prompt.contains("focusing on methodology"));
        let abstract_at = prompt.find("Paper ten studies attention.").unwrap();
        let results_at = prompt.find("Accuracy improves").unwrap();
        assert!(abstract_at < results_at);
    }

    #[tokio::test]
    async fn test_model_outage_is_unavailable() {
        let llm = Arc::new(ScriptedClient::default());
        llm.push_error(LlmError::Timeout).await;
        let tool = SummarizePaper::tool(testing::store().await, llm);

        let err = tool
            .handler
            .call(args(json!({"paper_id": 10})), &AgentContext::library(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Unavailable(_)));
    }
}
