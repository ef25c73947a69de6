use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use scholar_protocol::{AgentContext, PaperId, SectionType};
use scholar_store::ChunkStore;

use super::{MAX_CONTEXT_CHARS, join_text, parse_args, scoped_paper_chunks};
use crate::error::Result;
use crate::spec::{DataType, ToolParam, ToolSpec};
use crate::tool::{Tool, ToolHandler, ToolOutput};

/// Returns the text of one section of one paper.
pub struct ExtractSection {
    chunks: Arc<dyn ChunkStore>,
}

#[derive(Deserialize)]
struct Params {
    paper_id: PaperId,
    section: String,
}

impl ExtractSection {
    pub fn tool(chunks: Arc<dyn ChunkStore>) -> Tool {
        let spec = ToolSpec::new()
            .with_param(ToolParam::required(
                "paper_id",
                DataType::Integer,
                "Id of the paper.",
            ))
            .with_param(ToolParam::required(
                "section",
                DataType::String,
                "Section name, e.g. abstract, methods, results, conclusion.",
            ));

        Tool::new(
            "extract_section",
            "Return the full text of one section of a paper.",
            spec,
            Arc::new(Self { chunks }),
        )
    }
}

#[async_trait]
impl ToolHandler for ExtractSection {
    async fn call(&self, args: Map<String, Value>, context: &AgentContext) -> Result<ToolOutput> {
        let params: Params = parse_args(args)?;
        let wanted = SectionType::parse_lenient(&params.section);

        let chunks = scoped_paper_chunks(self.chunks.as_ref(), context, params.paper_id).await?;
        let mut available: Vec<SectionType> =
            chunks.iter().filter_map(|c| c.section_type).collect();
        available.sort();
        available.dedup();

        let matching: Vec<_> = chunks
            .iter()
            .filter(|c| c.section_type == Some(wanted))
            .collect();

        if matching.is_empty() {
            let names: Vec<&str> = available.iter().map(SectionType::as_str).collect();
            return Ok(ToolOutput::new(format!(
                "Paper {} has no {wanted} section. Available sections: {}.",
                params.paper_id,
                if names.is_empty() {
                    "none labelled".to_string()
                } else {
                    names.join(", ")
                }
            )));
        }

        Ok(ToolOutput::new(json!({
            "paper_id": params.paper_id,
            "section": wanted.as_str(),
            "text": join_text(matching, MAX_CONTEXT_CHARS),
        })))
    }
}
