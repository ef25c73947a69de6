//! Application configuration.
//!
//! One TOML file assembles every crate's config section. Missing sections
//! and fields fall back to their defaults, so an empty file is valid.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use scholar_agent::RouterConfig;
use scholar_llm::ProviderConfig;
use scholar_retrieval::RetrievalConfig;
use scholar_store::CacheSettings;

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    #[serde(rename = "openai")]
    OpenAI,

    /// Local feature hashing. No network, lower quality.
    Hashing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,

    /// Model name for the OpenAI backend.
    pub model: Option<String>,
    pub base_url: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,

    /// Vector size for the hashing backend. Must match the stored chunks.
    pub dimension: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::OpenAI,
            model: None,
            base_url: None,
            api_key_env: None,
            dimension: 256,
        }
    }
}

/// Everything the binary needs to build an assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding `chunks.jsonl` and `papers.jsonl`.
    pub data_dir: PathBuf,

    /// Directory for conversation transcripts. Defaults to
    /// `<data_dir>/transcripts`.
    pub transcripts_dir: Option<PathBuf>,

    pub llm: ProviderConfig,
    pub embeddings: EmbeddingSettings,
    pub retrieval: RetrievalConfig,
    pub router: RouterConfig,
    pub cache: CacheSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            transcripts_dir: None,
            llm: ProviderConfig::default(),
            embeddings: EmbeddingSettings::default(),
            retrieval: RetrievalConfig::default(),
            router: RouterConfig::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Load `path`, or the defaults when no path is given.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialise configuration")
    }

    pub fn transcripts_dir(&self) -> PathBuf {
        self.transcripts_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("transcripts"))
    }
}
