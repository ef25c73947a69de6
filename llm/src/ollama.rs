//! Local models served by Ollama.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::client::{CompletionClient, CompletionRequest, check_status, transport_error};
use crate::error::Result;

/// Ollama generate-endpoint client. Needs no key.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client for `model` on the default local port.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        });
        if let Some(system) = &request.system_prompt {
            body["system"] = serde_json::Value::from(system.as_str());
        }

        debug!("Requesting completion from {} ({})", self.name(), self.model);
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let parsed: GenerateResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(parsed.response)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
