//! Anthropic messages API.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::client::{CompletionClient, CompletionRequest, check_status, transport_error};
use crate::error::{LlmError, Result};

const API_VERSION: &str = "2023-06-01";

/// Anthropic messages client.
pub struct AnthropicClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client for `model` reading its key from `ANTHROPIC_API_KEY`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
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
impl CompletionClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::NotConfigured("Anthropic API key".to_string()))?;

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{"role": "user", "content": request.prompt}],
        });
        if let Some(system) = &request.system_prompt {
            body["system"] = serde_json::Value::from(system.as_str());
        }

        debug!("Requesting completion from {} ({})", self.name(), self.model);
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let parsed: MessagesResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(LlmError::InvalidResponse("no text content in response".to_string()));
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_complete_uses_system_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "ak"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(serde_json::json!({"system": "be brief"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "hello"}]
            })))
            .mount(&server)
            .await;

        let client = AnthropicClient::new("claude")
            .with_api_key("ak")
            .with_base_url(server.uri());
        let text = client
            .complete(&CompletionRequest::new("hi").with_system_prompt("be brief"))
            .await
            .unwrap();

        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = AnthropicClient {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            model: "claude".to_string(),
            client: reqwest::Client::new(),
        };

        let err = client
            .complete(&CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(_)));
    }
}
