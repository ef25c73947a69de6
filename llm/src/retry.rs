//! Bounded retry with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{CompletionClient, CompletionRequest};
use crate::error::{LlmError, Result};

/// How often and how patiently to retry transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds. Doubles per retry.
    pub initial_backoff_ms: u64,

    /// Upper bound on any single delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based) after `error`.
    pub fn backoff(&self, retry: u32, error: &LlmError) -> Duration {
        let exponential = self
            .initial_backoff_ms
            .saturating_mul(1u64 << retry.min(16));
        let requested = match error {
            LlmError::RateLimited { retry_after_secs } => retry_after_secs.saturating_mul(1000),
            _ => 0,
        };
        Duration::from_millis(exponential.max(requested).min(self.max_backoff_ms))
    }
}

/// Wraps a client and retries retryable errors.
pub struct RetryingClient {
    inner: Arc<dyn CompletionClient>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn CompletionClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl CompletionClient for RetryingClient {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut retry = 0;
        loop {
            match self.inner.complete(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && retry < self.policy.max_retries => {
                    let delay = self.policy.backoff(retry, &e);
                    warn!(
                        "Completion from {} failed ({e}); retry {} of {} in {}ms",
                        self.inner.name(),
                        retry + 1,
                        self.policy.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
