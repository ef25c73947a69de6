//! Append-only conversation transcripts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::chunks::read_jsonl;
use crate::error::Result;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl TranscriptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Message log keyed by conversation id.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Append a message to the end of a conversation.
    async fn append(&self, conversation_id: &str, message: TranscriptMessage) -> Result<()>;

    /// All messages of a conversation, oldest first.
    async fn history(&self, conversation_id: &str) -> Result<Vec<TranscriptMessage>>;
}

/// Transcripts held in memory.
#[derive(Clone, Default)]
pub struct InMemoryTranscripts {
    conversations: Arc<RwLock<HashMap<String, Vec<TranscriptMessage>>>>,
}

impl InMemoryTranscripts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscripts {
    async fn append(&self, conversation_id: &str, message: TranscriptMessage) -> Result<()> {
        self.conversations
            .write()
            .await
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn history(&self, conversation_id: &str) -> Result<Vec<TranscriptMessage>> {
        Ok(self
            .conversations
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Transcripts stored as one JSONL file per conversation.
pub struct FileTranscripts {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTranscripts {
    /// Use `root` as the transcript directory, creating it if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, conversation_id: &str) -> PathBuf {
        let safe: String = conversation_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{safe}.jsonl"))
    }
}

#[async_trait]
impl TranscriptStore for FileTranscripts {
    async fn append(&self, conversation_id: &str, message: TranscriptMessage) -> Result<()> {
        let mut line = serde_json::to_string(&message)?;
        line.push('\n');

        let path = self.path_for(conversation_id);
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Appended {:?} message to {}", message.role, path.display());
        Ok(())
    }

    async fn history(&self, conversation_id: &str) -> Result<Vec<TranscriptMessage>> {
        let path = self.path_for(conversation_id);
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        read_jsonl(&path).await
    }
}
