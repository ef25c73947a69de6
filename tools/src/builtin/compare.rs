use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use scholar_llm::{CompletionClient, CompletionRequest};
use scholar_protocol::{AgentContext, PaperId};
use scholar_store::ChunkStore;

use super::{MAX_CONTEXT_CHARS, join_text, parse_args, scoped_paper_chunks};
use crate::error::{Result, ToolError};
use crate::spec::{DataType, ParamConstraints, ToolParam, ToolSpec};
use crate::tool::{Tool, ToolHandler, ToolOutput};

const MAX_PAPERS: usize = 5;

const SYSTEM_PROMPT: &str = "You compare research papers for a researcher. Use only the paper \
     text provided and cite papers by their id.";

/// Compares several papers along one aspect.
pub struct ComparePapers {
    chunks: Arc<dyn ChunkStore>,
    llm: Arc<dyn CompletionClient>,
}

#[derive(Deserialize)]
struct Params {
    paper_ids: Vec<PaperId>,
    aspect: String,
}

impl ComparePapers {
    pub fn tool(chunks: Arc<dyn ChunkStore>, llm: Arc<dyn CompletionClient>) -> Tool {
        let spec = ToolSpec::new()
            .with_param(
                ToolParam::required("paper_ids", DataType::Array, "Ids of the papers to compare.")
                    .with_constraints(ParamConstraints::length(2, MAX_PAPERS)),
            )
            .with_param(ToolParam::required(
                "aspect",
                DataType::String,
                "What to compare, e.g. \"datasets\" or \"evaluation metrics\".",
            ));

        Tool::new(
            "compare_papers",
            "Compare two or more papers along one aspect.",
            spec,
            Arc::new(Self { chunks, llm }),
        )
    }
}

#[async_trait]
impl ToolHandler for ComparePapers {
    async fn call(&self, args: Map<String, Value>, context: &AgentContext) -> Result<ToolOutput> {
        let mut params: Params = parse_args(args)?;
        let mut seen = HashSet::new();
        params.paper_ids.retain(|id| seen.insert(*id));
        if params.paper_ids.len() < 2 {
            return Err(ToolError::InvalidInput(
                "paper_ids must name at least two distinct papers".to_string(),
            ));
        }

        let budget = MAX_CONTEXT_CHARS / params.paper_ids.len();
        let mut prompt = format!(
            "Compare the following papers with respect to {}.\n",
            params.aspect
        );
        for &paper_id in &params.paper_ids {
            let chunks = scoped_paper_chunks(self.chunks.as_ref(), context, paper_id).await?;
            prompt.push_str(&format!(
                "\n## Paper {paper_id}\n{}\n",
                join_text(&chunks, budget)
            ));
        }

        let request = CompletionRequest::new(prompt).with_system_prompt(SYSTEM_PROMPT);
        let comparison = self.llm.complete(&request).await?;

        Ok(ToolOutput::new(json!({
            "paper_ids": params.paper_ids,
            "aspect": params.aspect,
            "comparison": comparison.trim(),
        })))
    }
}
