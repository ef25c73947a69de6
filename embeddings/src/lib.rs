//! # Embeddings
//!
//! Dense vectors for queries and chunks, and the similarity maths the dense
//! half of retrieval runs on.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                   EmbeddingProvider                       │
//! ├───────────────────────────────────────────────────────────┤
//! │   OpenAIProvider (HTTP)        HashingProvider (local)    │
//! │            │                           │                  │
//! │            └──────────► Embedding ◄────┘                  │
//! │                             │                             │
//! │                             ▼                             │
//! │                   rank_by_similarity                      │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Chunk vectors are produced at ingestion time by the same model the
//! retriever queries with; mixing models or dimensions yields
//! [`EmbeddingError::DimensionMismatch`] instead of silently bad rankings.

pub mod error;
pub mod hashing;
pub mod openai;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use hashing::HashingProvider;
pub use openai::OpenAIProvider;
pub use provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
pub use similarity::{SimilarityResult, cosine_similarity, normalize, rank_by_similarity};

/// A dense vector.
pub type Embedding = Vec<f32>;
