//! # Protocol
//!
//! Data contracts shared by every layer of the research assistant:
//!
//! - **AgentContext**: who is asking and which documents a turn may read
//! - **Chunk**: a stored text fragment with its embedding and ownership
//! - **Canonical JSON**: order-independent rendering used for cache keys
//!   and action fingerprints
//!
//! ```text
//! ┌──────────────┐   scope    ┌──────────────┐   chunks   ┌──────────────┐
//! │ AgentContext │ ─────────► │  Retrieval   │ ◄───────── │ Chunk Store  │
//! └──────────────┘            └──────────────┘            └──────────────┘
//! ```

pub mod canonical;
pub mod chunk;
pub mod context;
pub mod error;

pub use canonical::canonical_json;
pub use chunk::{Chunk, ChunkId, PaperId, ProjectId, SectionType, UserId};
pub use context::{AgentContext, CONTEXT_FIELDS, Scope};
pub use error::ProtocolError;
