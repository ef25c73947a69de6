//! Provider selection.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::anthropic::AnthropicClient;
use crate::client::CompletionClient;
use crate::error::Result;
use crate::ollama::OllamaClient;
use crate::openai::OpenAIClient;
use crate::retry::{RetryPolicy, RetryingClient};

/// Which completion backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    fn default_key_env(self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Ollama => None,
        }
    }
}

/// Completion provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub model: String,

    /// Override the provider's default endpoint.
    pub base_url: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    pub retry: RetryPolicy,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAI,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key_env: None,
            timeout_secs: 60,
            retry: RetryPolicy::default(),
        }
    }
}

/// Build the configured client, wrapped in the retry policy.
pub fn build_client(config: &ProviderConfig) -> Result<Arc<dyn CompletionClient>> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let key = config
        .api_key_env
        .as_deref()
        .or(config.provider.default_key_env())
        .and_then(|name| std::env::var(name).ok());

    let inner: Arc<dyn CompletionClient> = match config.provider {
        ProviderKind::OpenAI => {
            let mut client = OpenAIClient::new(&config.model).with_http_client(http);
            if let Some(key) = key {
                client = client.with_api_key(key);
            }
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        ProviderKind::Anthropic => {
            let mut client = AnthropicClient::new(&config.model).with_http_client(http);
            if let Some(key) = key {
                client = client.with_api_key(key);
            }
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        ProviderKind::Ollama => {
            let mut client = OllamaClient::new(&config.model).with_http_client(http);
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
    };

    info!(
        "Using {} completion provider with model {}",
        inner.name(),
        inner.model()
    );
    Ok(Arc::new(RetryingClient::new(inner, config.retry)))
}
