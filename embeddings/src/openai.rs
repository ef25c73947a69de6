//! OpenAI-compatible `/embeddings` endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Seconds to wait when a 429 carries no usable `retry-after`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

pub struct OpenAIProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,

    /// Truncated output size, for models that support it.
    dimensions: Option<usize>,
}

impl OpenAIProvider {
    /// Provider for the public API, keyed from `OPENAI_API_KEY`.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: DEFAULT_MODEL.to_string(),
            dimensions: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Ask the API for shortened vectors.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct EmbeddingsBody<'a> {
    input: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsReply {
    data: Vec<EmbeddingItem>,
    model: String,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u64,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        match (self.dimensions, self.model.as_str()) {
            (Some(dimensions), _) => dimensions,
            (None, "text-embedding-3-large") => 3072,
            (None, _) => 1536,
        }
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(EmbeddingError::NotConfigured("OpenAI"))?;
        let model = request.model.as_deref().unwrap_or(&self.model);
        debug!("Embedding {} chars with {model}", request.text.len());

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&EmbeddingsBody {
                input: &request.text,
                model,
                dimensions: self.dimensions,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!("Embedding API rate limited, retry after {retry_after_secs}s");
            return Err(EmbeddingError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: EmbeddingsReply = response.json().await?;
        let Some(item) = reply.data.into_iter().next() else {
            return Err(EmbeddingError::MalformedResponse(
                "response contained no vectors".to_string(),
            ));
        };
        if let Some(expected) = self.dimensions {
            if item.embedding.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    left: expected,
                    right: item.embedding.len(),
                });
            }
        }

        Ok(EmbeddingResponse {
            embedding: item.embedding,
            model: reply.model,
            tokens_used: reply.usage.map(|usage| usage.total_tokens),
        })
    }
}
