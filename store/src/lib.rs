//! # Store
//!
//! Collaborator contracts the research core reads from and writes to, each
//! with an in-process implementation:
//!
//! - **Chunk Store**: chunks and the paper catalogue, queried by scope
//! - **Key-Value Cache**: best-effort cache with per-entry time-to-live
//! - **Transcripts**: append-only message log keyed by conversation
//! - **Ingestion**: start a job for a source file and poll its status
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Store                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ChunkStore ◄── retrieval        KeyValueCache ◄── tool cache   │
//! │  PaperCatalog ◄── list tools     TranscriptStore ◄── assistant  │
//! │  IngestionService ◄── ingestion tools                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod chunks;
pub mod error;
pub mod ingestion;
pub mod transcript;

pub use cache::{CacheSettings, CacheStats, InMemoryCache, KeyValueCache};
pub use chunks::{ChunkStore, InMemoryChunkStore, Paper, PaperCatalog, read_jsonl};
pub use error::{Result, StoreError};
pub use ingestion::{
    IngestionJob, IngestionRequest, IngestionService, IngestionStatus, QueuedIngestion,
};
pub use transcript::{
    FileTranscripts, InMemoryTranscripts, Role, TranscriptMessage, TranscriptStore,
};
