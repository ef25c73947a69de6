//! Configuration for the hybrid retriever.

use serde::{Deserialize, Serialize};

/// Configuration for the hybrid retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results returned when a request does not name its own `top_k`.
    pub top_k: usize,

    /// Smallest candidate set for which a keyword index is built. Below it
    /// only the dense ranking runs.
    pub sparse_min_chunks: usize,

    /// How dense and sparse rankings are combined.
    pub fusion: FusionMethod,

    /// BM25 parameters.
    pub bm25: Bm25Params,

    /// Embedding model to request, if not the provider default.
    pub embedding_model: Option<String>,
}

impl RetrievalConfig {
    /// Set the default number of results.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the keyword-index viability threshold.
    pub fn with_sparse_min_chunks(mut self, min: usize) -> Self {
        self.sparse_min_chunks = min;
        self
    }

    /// Set the fusion method.
    pub fn with_fusion(mut self, fusion: FusionMethod) -> Self {
        self.fusion = fusion;
        self
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            sparse_min_chunks: 5,
            fusion: FusionMethod::default(),
            bm25: Bm25Params::default(),
            embedding_model: None,
        }
    }
}

/// Rank fusion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FusionMethod {
    /// Reciprocal rank fusion: `sum(1 / (k + rank))`.
    Rrf { k: f32 },

    /// Weighted sum of min-max normalized scores.
    Weighted { dense: f32, sparse: f32 },
}

impl Default for FusionMethod {
    fn default() -> Self {
        Self::Rrf { k: 60.0 }
    }
}

/// BM25 term-saturation and length-normalization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}
