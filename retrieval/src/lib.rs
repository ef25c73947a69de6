//! # Retrieval Engine
//!
//! Turns a query plus an [`AgentContext`] into a ranked, citation-bearing list
//! of chunks:
//!
//! - **Scope resolution**: the context bounds the candidate set before any
//!   ranking happens, and every candidate belongs to the asking user
//! - **Dense ranking**: cosine similarity between query and chunk embeddings
//! - **Sparse ranking**: BM25 over the candidate texts
//! - **Fusion**: reciprocal-rank or weighted-score combination
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Hybrid Retriever                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  AgentContext ──► ┌──────────────┐ ◄── ChunkStore               │
//! │                   │    Scope     │                              │
//! │                   │  Resolution  │                              │
//! │                   └──────────────┘                              │
//! │                          │ candidates                           │
//! │              ┌───────────┴───────────┐                          │
//! │              ▼                       ▼                          │
//! │       ┌──────────────┐        ┌──────────────┐                  │
//! │       │    Dense     │        │    Sparse    │ (skipped below   │
//! │       │   (cosine)   │        │    (BM25)    │  sparse_min)     │
//! │       └──────────────┘        └──────────────┘                  │
//! │              └───────────┬───────────┘                          │
//! │                          ▼                                      │
//! │                   ┌──────────────┐                              │
//! │                   │    Fusion    │ ──► RetrievalOutcome         │
//! │                   └──────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scholar_retrieval::{HybridRetriever, RetrievalRequest, Retriever};
//!
//! let retriever = HybridRetriever::new(store, embedder);
//! let outcome = retriever
//!     .retrieve(RetrievalRequest::new("attention heads", context).with_top_k(5))
//!     .await?;
//! ```
//!
//! [`AgentContext`]: scholar_protocol::AgentContext

pub mod config;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod scope;
pub mod sparse;

pub use config::{Bm25Params, FusionMethod, RetrievalConfig};
pub use engine::{
    ChunkRef, HybridRetriever, RankingPath, RetrievalOutcome, RetrievalRequest, RetrievalResult,
    Retriever,
};
pub use error::{Result, RetrievalError};
