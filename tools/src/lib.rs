//! # Tools
//!
//! Everything the reasoning loop can call:
//!
//! - **Tool model**: a name, a description, a parameter spec and an async
//!   handler
//! - **Registry**: an ordered catalogue rendered into the prompt
//! - **Executor**: binds and validates arguments, writes the turn's context
//!   over them, runs the handler under a timeout and turns every outcome into
//!   an [`Observation`]
//! - **Result cache**: a handler wrapper keyed on the canonical arguments
//! - **Built-ins**: search, section extraction, summaries, comparisons, the
//!   paper list and ingestion
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Tool Executor                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  action, action_input                                           │
//! │        │                                                        │
//! │        ▼                                                        │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │   Registry   │ ─► │   ToolSpec   │ ─► │ AgentContext │       │
//! │  │   lookup     │    │   validate   │    │   override   │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! │                                                 │               │
//! │                                                 ▼               │
//! │                      ┌──────────────┐    ┌──────────────┐       │
//! │    Observation ◄──── │   timeout    │ ◄─ │ CachedHandler│       │
//! │                      └──────────────┘    │  (optional)  │       │
//! │                                          └──────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scholar_tools::{ResearchToolkit, ToolExecutor, ToolRegistry};
//!
//! let toolkit = ResearchToolkit::new(retriever, chunks, catalog, llm, ingestion)
//!     .with_cache(cache, Duration::from_secs(3600));
//! let registry = ToolRegistry::from_tools(toolkit.all(8))?;
//! let observation = ToolExecutor::new()
//!     .execute(&registry, "semantic_search", &json!({"query": "datasets"}), &context)
//!     .await;
//! ```

pub mod builtin;
pub mod cache;
pub mod error;
pub mod executor;
pub mod registry;
pub mod spec;
pub mod tool;

pub use builtin::{
    ComparePapers, ExtractSection, IngestionStatusTool, ListPapers, ResearchToolkit,
    SemanticSearch, StartIngestion, SummarizePaper,
};
pub use cache::{CachedHandler, digest};
pub use error::{Result, ToolError};
pub use executor::{Observation, ObservationKind, ToolExecutor};
pub use registry::ToolRegistry;
pub use spec::{DataType, ParamConstraints, ToolParam, ToolSpec};
pub use tool::{FnHandler, Tool, ToolHandler, ToolOutput, render_value};
