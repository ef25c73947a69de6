//! The embedding capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Embedding;
use crate::error::Result;

/// Text to embed, optionally with a model override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub text: String,

    /// Provider-specific model name. The provider default when unset.
    #[serde(default)]
    pub model: Option<String>,
}

impl EmbeddingRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embedding: Embedding,

    /// Model that produced the vector.
    pub model: String,

    /// Tokens billed, when the provider reports them.
    pub tokens_used: Option<u64>,
}

/// Turns text into a dense vector.
///
/// Implementations are shared across concurrent turns behind an `Arc`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Model used when a request names none.
    fn model(&self) -> &str;

    /// Length of the vectors produced by [`EmbeddingProvider::model`].
    fn dimension(&self) -> usize;

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;
}
