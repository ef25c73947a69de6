//! # LLM
//!
//! The completion capability the reasoning loop depends on:
//!
//! - **CompletionClient**: `complete(request) -> text`, one implementation per
//!   provider (OpenAI, Anthropic, Ollama)
//! - **RetryingClient**: bounded exponential backoff around any client
//! - **ScriptedClient**: replays canned completions and records prompts
//!
//! The provider is chosen once, from [`ProviderConfig`], when the process
//! starts.
//!
//! ```text
//! ┌──────────────┐    ┌────────────────┐    ┌──────────────────────┐
//! │ ReasoningLoop│ ─► │ RetryingClient │ ─► │ OpenAI | Anthropic | │
//! └──────────────┘    └────────────────┘    │ Ollama               │
//!                                           └──────────────────────┘
//! ```

pub mod anthropic;
pub mod client;
pub mod config;
pub mod error;
pub mod ollama;
pub mod openai;
pub mod retry;
pub mod scripted;

pub use anthropic::AnthropicClient;
pub use client::{CompletionClient, CompletionRequest};
pub use config::{ProviderConfig, ProviderKind, build_client};
pub use error::{LlmError, Result};
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
pub use retry::{RetryPolicy, RetryingClient};
pub use scripted::ScriptedClient;
