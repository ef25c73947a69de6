//! Wiring for the `scholar` binary: configuration, scope flags and service
//! construction.

pub mod app;
pub mod config;
pub mod scope;

pub use app::{App, replay_client};
pub use config::{AppConfig, EmbeddingBackend, EmbeddingSettings};
pub use scope::ScopeArgs;
