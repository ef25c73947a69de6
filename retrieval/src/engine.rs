//! Hybrid retriever implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use scholar_embeddings::{EmbeddingProvider, EmbeddingRequest, rank_by_similarity};
use scholar_protocol::{AgentContext, Chunk, ChunkId, PaperId, SectionType};
use scholar_store::ChunkStore;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::fusion::{Fused, fuse};
use crate::scope::{filter_sections, resolve_candidates};
use crate::sparse::Bm25Index;

/// One retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalRequest {
    /// Natural-language query.
    pub query: String,

    /// Identity and scope of the caller.
    pub context: AgentContext,

    /// Number of results; the configured default when `None`.
    pub top_k: Option<usize>,

    /// Restrict candidates to these sections. Empty means no restriction.
    pub sections: Vec<SectionType>,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>, context: AgentContext) -> Self {
        Self {
            query: query.into(),
            context,
            top_k: None,
            sections: Vec::new(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_sections(mut self, sections: Vec<SectionType>) -> Self {
        self.sections = sections;
        self
    }
}

/// Which ranking path produced a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingPath {
    /// Dense and sparse rankings were fused.
    Hybrid,

    /// Too few candidates for a keyword index; dense ranking only.
    DenseOnly,

    /// The scope held no candidates, so nothing was ranked.
    Empty,
}

/// The citation-bearing part of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRef {
    pub chunk_id: ChunkId,
    pub paper_id: PaperId,
    pub section_type: Option<SectionType>,
    pub order_index: u32,
    pub text: String,
}

impl From<&Chunk> for ChunkRef {
    fn from(chunk: &Chunk) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            paper_id: chunk.paper_id,
            section_type: chunk.section_type,
            order_index: chunk.order_index,
            text: chunk.text.clone(),
        }
    }
}

/// A ranked chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: ChunkRef,

    /// Fused score, or cosine similarity on the dense-only path.
    pub score: f32,

    /// 1-based position in the result list.
    pub rank: usize,

    /// Position in the dense ranking.
    pub dense_rank: Option<usize>,

    /// Position in the sparse ranking, if the chunk matched any query term.
    pub sparse_rank: Option<usize>,
}

/// Results plus how they were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub results: Vec<RetrievalResult>,
    pub path: RankingPath,

    /// Size of the candidate set after scope and section filtering.
    pub candidates: usize,
}

impl RetrievalOutcome {
    fn empty() -> Self {
        Self {
            results: Vec::new(),
            path: RankingPath::Empty,
            candidates: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Scoped retrieval.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, request: RetrievalRequest) -> Result<RetrievalOutcome>;
}

/// Dense + BM25 retriever over a [`ChunkStore`].
///
/// Holds no mutable state; one instance serves concurrent turns.
#[derive(Clone)]
pub struct HybridRetriever {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    /// Create a retriever with the default configuration.
    pub fn new(store: Arc<dyn ChunkStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            config: RetrievalConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut request = EmbeddingRequest::new(query);
        if let Some(model) = &self.config.embedding_model {
            request = request.with_model(model.clone());
        }
        Ok(self.embedder.embed(request).await?.embedding)
    }

    /// Cosine ranking of the candidates. Chunks embedded with a different
    /// dimension than the query are left out of the dense ranking.
    fn dense_ranking(query: &[f32], candidates: &[Chunk]) -> Result<Vec<(usize, f32)>> {
        let (usable, skipped): (Vec<usize>, Vec<usize>) = (0..candidates.len())
            .partition(|&i| candidates[i].embedding.len() == query.len());
        if !skipped.is_empty() {
            let ids: Vec<&str> = skipped.iter().map(|&i| candidates[i].id.as_str()).collect();
            warn!(
                "Skipping {} chunks whose embeddings do not have {} dimensions: {}",
                ids.len(),
                query.len(),
                ids.join(", ")
            );
        }

        let embeddings: Vec<&[f32]> = usable
            .iter()
            .map(|&i| candidates[i].embedding.as_slice())
            .collect();
        Ok(rank_by_similarity(query, &embeddings)?
            .into_iter()
            .map(|r| (usable[r.index], r.score))
            .collect())
    }

    fn sparse_ranking(&self, query: &str, candidates: &[Chunk]) -> Vec<(usize, f32)> {
        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let index = Bm25Index::build(&texts, self.config.bm25);

        let mut ranking: Vec<(usize, f32)> = index
            .score(query)
            .into_iter()
            .enumerate()
            .filter(|&(_, score)| score > 0.0)
            .collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranking
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(&self, request: RetrievalRequest) -> Result<RetrievalOutcome> {
        let mut candidates = resolve_candidates(self.store.as_ref(), &request.context).await?;
        filter_sections(&mut candidates, &request.sections);

        if candidates.is_empty() {
            debug!("No candidates for query in {} scope", request.context.scope);
            return Ok(RetrievalOutcome::empty());
        }

        let top_k = request.top_k.unwrap_or(self.config.top_k);
        let query_embedding = self.embed_query(&request.query).await?;
        let dense = Self::dense_ranking(&query_embedding, &candidates)?;

        let (fused, path) = if candidates.len() < self.config.sparse_min_chunks {
            let fused: Vec<Fused> = dense
                .iter()
                .enumerate()
                .map(|(rank, &(index, score))| Fused {
                    index,
                    score,
                    dense_rank: Some(rank + 1),
                    sparse_rank: None,
                })
                .collect();
            (fused, RankingPath::DenseOnly)
        } else {
            let sparse = self.sparse_ranking(&request.query, &candidates);
            (fuse(&dense, &sparse, self.config.fusion), RankingPath::Hybrid)
        };

        let results: Vec<RetrievalResult> = fused
            .into_iter()
            .take(top_k)
            .enumerate()
            .filter_map(|(position, f)| {
                candidates.get(f.index).map(|chunk| RetrievalResult {
                    chunk: ChunkRef::from(chunk),
                    score: f.score,
                    rank: position + 1,
                    dense_rank: f.dense_rank,
                    sparse_rank: f.sparse_rank,
                })
            })
            .collect();

        info!(
            "Retrieved {} of {} candidates via {path:?} for user {}",
            results.len(),
            candidates.len(),
            request.context.user_id
        );

        Ok(RetrievalOutcome {
            results,
            path,
            candidates: candidates.len(),
        })
    }
}
