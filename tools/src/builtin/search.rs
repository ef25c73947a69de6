use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use scholar_protocol::{AgentContext, SectionType};
use scholar_retrieval::{RetrievalRequest, Retriever};

use super::parse_args;
use crate::error::Result;
use crate::spec::{DataType, ParamConstraints, ToolParam, ToolSpec};
use crate::tool::{Tool, ToolHandler, ToolOutput};

/// Scoped hybrid search over the chunks the turn may read.
pub struct SemanticSearch {
    retriever: Arc<dyn Retriever>,
    default_top_k: usize,

    /// Sections searched first when the model names none.
    preferred_sections: Vec<SectionType>,
}

#[derive(Deserialize)]
struct Params {
    query: String,
    top_k: Option<usize>,
    #[serde(default)]
    sections: Vec<String>,
}

impl SemanticSearch {
    pub fn tool(retriever: Arc<dyn Retriever>, default_top_k: usize) -> Tool {
        Self::preferring(retriever, default_top_k, Vec::new())
    }

    /// Like [`SemanticSearch::tool`], but searches `sections` first when the
    /// model names none, widening to the whole scope if they have no hits.
    pub fn preferring(
        retriever: Arc<dyn Retriever>,
        default_top_k: usize,
        preferred_sections: Vec<SectionType>,
    ) -> Tool {
        let spec = ToolSpec::new()
            .with_param(ToolParam::required(
                "query",
                DataType::String,
                "Natural-language description of the passages to find.",
            ))
            .with_param(
                ToolParam::optional("top_k", DataType::Integer, "Number of passages to return.")
                    .with_default(Value::from(default_top_k))
                    .with_constraints(ParamConstraints::range(1.0, 50.0)),
            )
            .with_param(ToolParam::optional(
                "sections",
                DataType::Array,
                "Only search these sections, e.g. [\"methods\", \"results\"].",
            ));

        Tool::new(
            "semantic_search",
            "Search the papers in the current scope and return the most relevant passages \
             with their paper id and section.",
            spec,
            Arc::new(Self {
                retriever,
                default_top_k,
                preferred_sections,
            }),
        )
    }

    /// Cache identity for one configuration. Searches with a different
    /// default size or preferred sections answer the same arguments
    /// differently.
    pub fn cache_identity(default_top_k: usize, preferred_sections: &[SectionType]) -> String {
        let sections: Vec<&str> = preferred_sections.iter().map(SectionType::as_str).collect();
        format!(
            "semantic_search:top_k={default_top_k}:prefer={}",
            sections.join(",")
        )
    }
}

#[async_trait]
impl ToolHandler for SemanticSearch {
    async fn call(&self, args: Map<String, Value>, context: &AgentContext) -> Result<ToolOutput> {
        let params: Params = parse_args(args)?;
        let sections: Vec<SectionType> = params
            .sections
            .iter()
            .map(|s| SectionType::parse_lenient(s))
            .collect();

        let top_k = params.top_k.unwrap_or(self.default_top_k);
        let request = |sections: Vec<SectionType>| {
            RetrievalRequest::new(params.query.clone(), context.clone())
                .with_top_k(top_k)
                .with_sections(sections)
        };

        let preferred = sections.is_empty() && !self.preferred_sections.is_empty();
        let mut outcome = if preferred {
            self.retriever
                .retrieve(request(self.preferred_sections.clone()))
                .await?
        } else {
            self.retriever.retrieve(request(sections)).await?
        };
        if preferred && outcome.is_empty() {
            debug!("No hits in preferred sections, widening to the whole scope");
            outcome = self.retriever.retrieve(request(Vec::new())).await?;
        }

        if outcome.is_empty() {
            return Ok(ToolOutput::new(json!({
                "results": [],
                "message": format!("No passages matched in the current {} scope.", context.scope),
            })));
        }

        let results: Vec<Value> = outcome
            .results
            .iter()
            .map(|r| {
                json!({
                    "rank": r.rank,
                    "paper_id": r.chunk.paper_id,
                    "chunk_id": r.chunk.chunk_id,
                    "section": r.chunk.section_type.map(|s| s.as_str()),
                    "score": r.score,
                    "text": r.chunk.text,
                })
            })
            .collect();

        Ok(ToolOutput::new(json!({
            "ranking": outcome.path,
            "candidates": outcome.candidates,
            "results": results,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::testing;
    use pretty_assertions::assert_eq;
    use scholar_embeddings::HashingProvider;
    use scholar_retrieval::HybridRetriever;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_search_respects_scope_and_sections() {
        let store = testing::store().await;
        let retriever = HybridRetriever::new(store, Arc::new(HashingProvider::new(2)));
        let tool = SemanticSearch::tool(Arc::new(retriever), 5);

        let out = tool
            .handler
            .call(
                args(json!({"query": "accuracy", "sections": ["findings"]})),
                &AgentContext::project(1, 1),
            )
            .await
            .unwrap();

        let results = out.value["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["paper_id"], json!(10));
        assert_eq!(results[0]["section"], json!("results"));
    }

    #[tokio::test]
    async fn test_preferred_sections_widen_when_empty() {
        let store = testing::store().await;
        let retriever = HybridRetriever::new(store, Arc::new(HashingProvider::new(2)));
        let tool = SemanticSearch::preferring(
            Arc::new(retriever),
            5,
            vec![SectionType::Conclusion],
        );

        let out = tool
            .handler
            .call(args(json!({"query": "transformer"})), &AgentContext::document(1, 10))
            .await
            .unwrap();

        assert_eq!(out.value["results"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_scope_says_so() {
        let store = testing::store().await;
        let retriever = HybridRetriever::new(store, Arc::new(HashingProvider::new(2)));
        let tool = SemanticSearch::tool(Arc::new(retriever), 5);

        let out = tool
            .handler
            .call(args(json!({"query": "x"})), &AgentContext::project(1, 99))
            .await
            .unwrap();

        assert_eq!(out.value["results"], json!([]));
        assert!(out.value["message"].as_str().unwrap().contains("project"));
    }
}
