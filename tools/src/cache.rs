//! Result caching for tool handlers.
//!
//! `CachedHandler` keys each call on the tool identity and the canonical
//! rendering of its arguments. Arguments already carry the turn's identity
//! and scope fields, so entries never cross users or scopes.
//!
//! The cache is best-effort: lookup or store failures are logged and the
//! handler runs uncached. Two identical calls racing on a cold key may both
//! run the handler; only later calls are guaranteed a hit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use scholar_protocol::{AgentContext, canonical_json};
use scholar_store::KeyValueCache;

use crate::error::Result;
use crate::tool::{Tool, ToolHandler, ToolOutput};

/// SHA-256 hex digest of a name and a JSON value rendered canonically.
pub fn digest(name: &str, value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical_json(value).as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Wraps a handler with a key-value cache.
pub struct CachedHandler {
    identity: String,
    inner: Arc<dyn ToolHandler>,
    cache: Arc<dyn KeyValueCache>,
    ttl: Duration,
}

impl CachedHandler {
    pub fn new(
        identity: impl Into<String>,
        inner: Arc<dyn ToolHandler>,
        cache: Arc<dyn KeyValueCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            identity: identity.into(),
            inner,
            cache,
            ttl,
        }
    }

    fn key(&self, args: &Map<String, Value>) -> String {
        format!(
            "tool:{}:{}",
            self.identity,
            digest(&self.identity, &Value::Object(args.clone()))
        )
    }
}

#[async_trait]
impl ToolHandler for CachedHandler {
    async fn call(&self, args: Map<String, Value>, context: &AgentContext) -> Result<ToolOutput> {
        let key = self.key(&args);

        match self.cache.get(&key).await {
            Ok(Some(value)) => {
                debug!("Cache hit for {}", self.identity);
                return Ok(ToolOutput {
                    value,
                    cache_hit: true,
                    return_direct: false,
                });
            }
            Ok(None) => {}
            Err(e) => warn!("Cache lookup for {} failed, running uncached: {e}", self.identity),
        }

        let output = self.inner.call(args, context).await?;

        if let Err(e) = self.cache.set(&key, output.value.clone(), self.ttl).await {
            warn!("Cache store for {} failed: {e}", self.identity);
        }
        Ok(output)
    }
}

impl Tool {
    /// Wrap this tool's handler in a [`CachedHandler`] keyed on the tool name.
    pub fn cached(self, cache: Arc<dyn KeyValueCache>, ttl: Duration) -> Self {
        let identity = self.name.clone();
        self.cached_as(identity, cache, ttl)
    }

    /// Like [`Tool::cached`], with an explicit identity. Handlers sharing a
    /// name but configured differently must use distinct identities.
    pub fn cached_as(
        mut self,
        identity: impl Into<String>,
        cache: Arc<dyn KeyValueCache>,
        ttl: Duration,
    ) -> Self {
        self.handler = Arc::new(CachedHandler::new(identity, self.handler, cache, ttl));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ToolSpec;
    use pretty_assertions::assert_eq;
    use scholar_store::{InMemoryCache, StoreError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenCache;

    #[async_trait]
    impl KeyValueCache for BrokenCache {
        async fn get(&self, _: &str) -> scholar_store::Result<Option<Value>> {
            Err(StoreError::Unavailable("redis down".to_string()))
        }

        async fn set(&self, _: &str, _: Value, _: Duration) -> scholar_store::Result<()> {
            Err(StoreError::Unavailable("redis down".to_string()))
        }
    }

    fn counting_tool(calls: Arc<AtomicUsize>) -> Tool {
        Tool::from_fn("count", "Counts calls.", ToolSpec::new(), move |args, _| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(ToolOutput::new(json!({"n": n, "q": args.get("q").cloned()})))
            }
        })
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_digest_ignores_key_order() {
        assert_eq!(
            digest("t", &json!({"a": 1, "b": [1, 2]})),
            digest("t", &json!({"b": [1, 2], "a": 1}))
        );
        assert_ne!(digest("t", &json!({"a": 1})), digest("u", &json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_identical_calls_hit_handler_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tool = counting_tool(calls.clone())
            .cached(Arc::new(InMemoryCache::new(100)), Duration::from_secs(60));
        let ctx = AgentContext::library(1);

        let first = tool.handler.call(args(json!({"q": "x"})), &ctx).await.unwrap();
        let second = tool.handler.call(args(json!({"q": "x"})), &ctx).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.value, second.value);

        let other = tool.handler.call(args(json!({"q": "y"})), &ctx).await.unwrap();
        assert!(!other.cache_hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_failure_falls_back_to_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tool =
            counting_tool(calls.clone()).cached(Arc::new(BrokenCache), Duration::from_secs(60));
        let ctx = AgentContext::library(1);

        for _ in 0..2 {
            let out = tool.handler.call(args(json!({"q": "x"})), &ctx).await.unwrap();
            assert!(!out.cache_hit);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_identities_do_not_share_entries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache: Arc<dyn KeyValueCache> = Arc::new(InMemoryCache::new(100));
        let ttl = Duration::from_secs(60);
        let narrow = counting_tool(calls.clone()).cached_as("count:1", cache.clone(), ttl);
        let wide = counting_tool(calls.clone()).cached_as("count:8", cache, ttl);
        let ctx = AgentContext::library(1);

        let first = narrow
            .handler
            .call(args(json!({"q": "x"})), &ctx)
            .await
            .unwrap();
        let second = wide
            .handler
            .call(args(json!({"q": "x"})), &ctx)
            .await
            .unwrap();

        assert!(!first.cache_hit);
        assert!(!second.cache_hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let tool = Tool::from_fn("flaky", "Fails.", ToolSpec::new(), move |_, _| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(crate::ToolError::ExecutionFailed("nope".to_string()))
            }
        })
        .cached(Arc::new(InMemoryCache::new(10)), Duration::from_secs(60));
        let ctx = AgentContext::library(1);

        assert!(tool.handler.call(Map::new(), &ctx).await.is_err());
        assert!(tool.handler.call(Map::new(), &ctx).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
