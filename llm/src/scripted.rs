//! A client that replays canned completions.
//!
//! Used by tests and by offline runs of the binary. Every request is
//! recorded so callers can assert on the prompts that were sent.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::client::{CompletionClient, CompletionRequest};
use crate::error::{LlmError, Result};

/// Replays a queue of completions in order.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    /// Create a client that returns `responses` in order.
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another completion.
    pub async fn push(&self, response: impl Into<String>) {
        self.script.lock().await.push_back(Ok(response.into()));
    }

    /// Queue a failure.
    pub async fn push_error(&self, error: LlmError) {
        self.script.lock().await.push_back(Err(error));
    }

    /// Number of `complete` calls so far.
    pub async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Every request received, oldest first.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().await.push(request.clone());
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_replays_in_order_and_records() {
        let client = ScriptedClient::new(["one", "two"]);

        assert_eq!(client.complete(&CompletionRequest::new("a")).await.unwrap(), "one");
        assert_eq!(client.complete(&CompletionRequest::new("b")).await.unwrap(), "two");
        assert!(client.complete(&CompletionRequest::new("c")).await.is_err());

        let prompts: Vec<String> = client
            .requests()
            .await
            .into_iter()
            .map(|r| r.prompt)
            .collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);
    }
}
