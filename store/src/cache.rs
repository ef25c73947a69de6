//! Best-effort key-value cache with per-entry time-to-live.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::Result;

/// A key-value cache. Callers treat every error as a miss.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Look up a live entry.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store a value that expires after `ttl`.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    expires_at: Instant,
}

/// In-process cache bounded by entry count.
#[derive(Clone)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    max_entries: usize,
}

impl InMemoryCache {
    /// Create a cache holding at most `max_entries` live values.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries: max_entries.max(1),
        }
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        info!("Cleared key-value cache");
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let now = Instant::now();
        CacheStats {
            entries: entries.len(),
            expired: entries.values().filter(|e| e.expires_at <= now).count(),
            max_entries: self.max_entries,
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(CacheSettings::default().max_entries)
    }
}

#[async_trait]
impl KeyValueCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it so it stops counting against capacity.
        self.entries.write().await.remove(key);
        debug!("Cache entry {key} expired");
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        entries.retain(|_, e| e.expires_at > now);

        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + ttl,
            },
        );
        debug!("Cached {key} for {}s", ttl.as_secs());
        Ok(())
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub max_entries: usize,
}

/// Cache sizing and default time-to-live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of live entries.
    pub max_entries: usize,

    /// Default time-to-live for tool results, in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl_secs: 3600,
        }
    }
}

impl CacheSettings {
    /// Default time-to-live as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
