//! Built-in research tools.
//!
//! Each tool is a thin adapter over one collaborator: the retriever, the
//! chunk store, the paper catalogue, the completion client or the ingestion
//! service. [`ResearchToolkit`] holds those collaborators and hands out
//! ready-made [`Tool`]s.

mod compare;
mod extract;
mod ingestion;
mod papers;
mod search;
mod summarize;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use scholar_llm::CompletionClient;
use scholar_protocol::{AgentContext, Chunk, PaperId, Scope, SectionType};
use scholar_retrieval::Retriever;
use scholar_store::{ChunkStore, IngestionService, KeyValueCache, PaperCatalog};

use crate::error::{Result, ToolError};
use crate::tool::Tool;

pub use compare::ComparePapers;
pub use extract::ExtractSection;
pub use ingestion::{IngestionStatusTool, StartIngestion};
pub use papers::ListPapers;
pub use search::SemanticSearch;
pub use summarize::SummarizePaper;

/// Upper bound on paper text handed to the completion client.
const MAX_CONTEXT_CHARS: usize = 12_000;

/// Collaborators shared by the built-in tools.
#[derive(Clone)]
pub struct ResearchToolkit {
    pub retriever: Arc<dyn Retriever>,
    pub chunks: Arc<dyn ChunkStore>,
    pub catalog: Arc<dyn PaperCatalog>,
    pub llm: Arc<dyn CompletionClient>,
    pub ingestion: Arc<dyn IngestionService>,
    cache: Option<(Arc<dyn KeyValueCache>, Duration)>,
}

impl ResearchToolkit {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        chunks: Arc<dyn ChunkStore>,
        catalog: Arc<dyn PaperCatalog>,
        llm: Arc<dyn CompletionClient>,
        ingestion: Arc<dyn IngestionService>,
    ) -> Self {
        Self {
            retriever,
            chunks,
            catalog,
            llm,
            ingestion,
            cache: None,
        }
    }

    /// Cache the read-only tools' results.
    pub fn with_cache(mut self, cache: Arc<dyn KeyValueCache>, ttl: Duration) -> Self {
        self.cache = Some((cache, ttl));
        self
    }

    fn maybe_cached(&self, tool: Tool) -> Tool {
        match &self.cache {
            Some((cache, ttl)) => tool.cached(cache.clone(), *ttl),
            None => tool,
        }
    }

    /// `semantic_search`, returning `default_top_k` passages unless asked.
    pub fn semantic_search(&self, default_top_k: usize) -> Tool {
        self.semantic_search_preferring(default_top_k, Vec::new())
    }

    /// `semantic_search` that tries `sections` first when the model names none.
    pub fn semantic_search_preferring(
        &self,
        default_top_k: usize,
        sections: Vec<SectionType>,
    ) -> Tool {
        let identity = SemanticSearch::cache_identity(default_top_k, &sections);
        let tool = SemanticSearch::preferring(self.retriever.clone(), default_top_k, sections);
        match &self.cache {
            Some((cache, ttl)) => tool.cached_as(identity, cache.clone(), *ttl),
            None => tool,
        }
    }

    pub fn extract_section(&self) -> Tool {
        self.maybe_cached(ExtractSection::tool(self.chunks.clone()))
    }

    pub fn summarize_paper(&self) -> Tool {
        self.maybe_cached(SummarizePaper::tool(self.chunks.clone(), self.llm.clone()))
    }

    pub fn compare_papers(&self) -> Tool {
        self.maybe_cached(ComparePapers::tool(self.chunks.clone(), self.llm.clone()))
    }

    /// `list_papers`. Never cached; the catalogue changes as ingestion runs.
    pub fn list_papers(&self) -> Tool {
        ListPapers::tool(self.catalog.clone())
    }

    pub fn start_ingestion(&self) -> Tool {
        StartIngestion::tool(self.ingestion.clone())
    }

    pub fn ingestion_status(&self) -> Tool {
        IngestionStatusTool::tool(self.ingestion.clone())
    }

    /// Every built-in tool, for a specialist loop.
    pub fn all(&self, default_top_k: usize) -> Vec<Tool> {
        vec![
            self.semantic_search(default_top_k),
            self.extract_section(),
            self.summarize_paper(),
            self.compare_papers(),
            self.list_papers(),
            self.start_ingestion(),
            self.ingestion_status(),
        ]
    }
}

/// Deserialize handler arguments into a typed struct. Unknown keys (such as
/// the injected context fields) are ignored.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args)).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

/// Whether `context` may read `paper_id`.
pub(crate) fn paper_in_scope(context: &AgentContext, chunk: &Chunk) -> bool {
    if chunk.owner_id != context.user_id {
        return false;
    }
    match context.scope {
        Scope::Document => context.document_id() == Some(chunk.paper_id),
        Scope::Selection => {
            context.selected_document_ids.contains(&chunk.paper_id)
                && context
                    .project_id
                    .is_none_or(|p| chunk.project_id == Some(p))
        }
        Scope::Project => context.project_id.is_some() && chunk.project_id == context.project_id,
        Scope::Library => true,
    }
}

/// Chunks of one paper the context may read, in reading order.
pub(crate) async fn scoped_paper_chunks(
    store: &dyn ChunkStore,
    context: &AgentContext,
    paper_id: PaperId,
) -> Result<Vec<Chunk>> {
    let mut chunks = store.chunks_for_paper(context.user_id, paper_id).await?;
    chunks.retain(|c| paper_in_scope(context, c));
    if chunks.is_empty() {
        return Err(ToolError::NotFound(format!(
            "paper {paper_id} in the current {} scope",
            context.scope
        )));
    }
    chunks.sort_by(|a, b| a.order_index.cmp(&b.order_index).then_with(|| a.id.cmp(&b.id)));
    Ok(chunks)
}

/// Join chunk texts, stopping at `max_chars`.
pub(crate) fn join_text<'a>(
    chunks: impl IntoIterator<Item = &'a Chunk>,
    max_chars: usize,
) -> String {
    let mut out = String::new();
    for chunk in chunks {
        let remaining = max_chars.saturating_sub(out.chars().count());
        if remaining == 0 {
            break;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.extend(chunk.text.chars().take(remaining));
    }
    out
}
