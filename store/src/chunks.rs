//! Chunk store and paper catalogue.
//!
//! The store answers scope-shaped queries directly so that retrieval only
//! ever sees the chunks a turn is allowed to read. Every query is keyed by the
//! owning user.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use scholar_protocol::{Chunk, ChunkId, PaperId, ProjectId, UserId};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::ingestion::IngestionStatus;

/// A catalogue entry for an ingested paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    pub owner_id: UserId,
    #[serde(default = "default_status")]
    pub status: IngestionStatus,
}

fn default_status() -> IngestionStatus {
    IngestionStatus::Completed
}

impl Paper {
    /// Create a completed paper with no authors.
    pub fn new(id: PaperId, title: impl Into<String>, owner_id: UserId) -> Self {
        Self {
            id,
            title: title.into(),
            authors: Vec::new(),
            year: None,
            project_id: None,
            owner_id,
            status: IngestionStatus::Completed,
        }
    }

    /// Set the owning project.
    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }
}

/// Read access to stored chunks, one method per retrieval scope.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Chunks of one paper owned by `owner_id`.
    async fn chunks_for_paper(&self, owner_id: UserId, paper_id: PaperId) -> Result<Vec<Chunk>>;

    /// Chunks of the listed papers owned by `owner_id`.
    async fn chunks_for_papers(&self, owner_id: UserId, paper_ids: &[PaperId])
    -> Result<Vec<Chunk>>;

    /// Chunks of one project owned by `owner_id`.
    async fn chunks_for_project(
        &self,
        owner_id: UserId,
        project_id: ProjectId,
    ) -> Result<Vec<Chunk>>;

    /// Every chunk owned by `owner_id`.
    async fn chunks_for_owner(&self, owner_id: UserId) -> Result<Vec<Chunk>>;

    /// Insert or replace a chunk by id.
    async fn upsert_chunk(&self, chunk: Chunk) -> Result<()>;
}

/// Read access to paper metadata.
#[async_trait]
pub trait PaperCatalog: Send + Sync {
    /// Papers owned by `owner_id`, optionally limited to one project.
    async fn list_papers(
        &self,
        owner_id: UserId,
        project_id: Option<ProjectId>,
    ) -> Result<Vec<Paper>>;

    /// One paper, if it exists and belongs to `owner_id`.
    async fn get_paper(&self, owner_id: UserId, paper_id: PaperId) -> Result<Option<Paper>>;

    /// Insert or replace a paper by id.
    async fn upsert_paper(&self, paper: Paper) -> Result<()>;
}

#[derive(Default)]
struct Inner {
    chunks: HashMap<ChunkId, Chunk>,
    by_paper: HashMap<PaperId, BTreeSet<ChunkId>>,
    by_project: HashMap<ProjectId, BTreeSet<ChunkId>>,
    by_owner: HashMap<UserId, BTreeSet<ChunkId>>,
    papers: HashMap<PaperId, Paper>,
}

impl Inner {
    fn unindex(&mut self, chunk: &Chunk) {
        if let Some(ids) = self.by_paper.get_mut(&chunk.paper_id) {
            ids.remove(&chunk.id);
        }
        if let Some(ids) = chunk
            .project_id
            .and_then(|project_id| self.by_project.get_mut(&project_id))
        {
            ids.remove(&chunk.id);
        }
        if let Some(ids) = self.by_owner.get_mut(&chunk.owner_id) {
            ids.remove(&chunk.id);
        }
    }

    fn index(&mut self, chunk: &Chunk) {
        self.by_paper
            .entry(chunk.paper_id)
            .or_default()
            .insert(chunk.id.clone());
        if let Some(project_id) = chunk.project_id {
            self.by_project
                .entry(project_id)
                .or_default()
                .insert(chunk.id.clone());
        }
        self.by_owner
            .entry(chunk.owner_id)
            .or_default()
            .insert(chunk.id.clone());
    }

    fn collect<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a ChunkId>,
        owner_id: UserId,
    ) -> Vec<Chunk> {
        ids.into_iter()
            .filter_map(|id| self.chunks.get(id))
            .filter(|chunk| chunk.owner_id == owner_id)
            .cloned()
            .collect()
    }
}

/// In-memory chunk store with per-scope indices.
#[derive(Clone, Default)]
pub struct InMemoryChunkStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryChunkStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `chunks.jsonl` and, if present, `papers.jsonl` from a directory.
    ///
    /// This is the hand-off format of the ingestion pipeline: one JSON
    /// record per line.
    pub async fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let store = Self::new();

        let papers_path = dir.join("papers.jsonl");
        if fs::try_exists(&papers_path).await? {
            for paper in read_jsonl::<Paper>(&papers_path).await? {
                store.upsert_paper(paper).await?;
            }
        }

        let chunks: Vec<Chunk> = read_jsonl(&dir.join("chunks.jsonl")).await?;
        let count = chunks.len();
        for chunk in chunks {
            store.upsert_chunk(chunk).await?;
        }

        info!("Loaded {count} chunks from {}", dir.display());
        Ok(store)
    }

    /// Number of stored chunks.
    pub async fn len(&self) -> usize {
        self.inner.read().await.chunks.len()
    }

    /// Whether the store holds no chunks.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.chunks.is_empty()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn chunks_for_paper(&self, owner_id: UserId, paper_id: PaperId) -> Result<Vec<Chunk>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_paper
            .get(&paper_id)
            .map(|ids| inner.collect(ids, owner_id))
            .unwrap_or_default())
    }

    async fn chunks_for_papers(
        &self,
        owner_id: UserId,
        paper_ids: &[PaperId],
    ) -> Result<Vec<Chunk>> {
        let inner = self.inner.read().await;
        let unique: BTreeSet<PaperId> = paper_ids.iter().copied().collect();
        Ok(unique
            .iter()
            .filter_map(|id| inner.by_paper.get(id))
            .flat_map(|ids| inner.collect(ids, owner_id))
            .collect())
    }

    async fn chunks_for_project(
        &self,
        owner_id: UserId,
        project_id: ProjectId,
    ) -> Result<Vec<Chunk>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_project
            .get(&project_id)
            .map(|ids| inner.collect(ids, owner_id))
            .unwrap_or_default())
    }

    async fn chunks_for_owner(&self, owner_id: UserId) -> Result<Vec<Chunk>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_owner
            .get(&owner_id)
            .map(|ids| inner.collect(ids, owner_id))
            .unwrap_or_default())
    }

    async fn upsert_chunk(&self, chunk: Chunk) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(previous) = inner.chunks.remove(&chunk.id) {
            inner.unindex(&previous);
        }
        inner.index(&chunk);
        debug!("Upserted chunk {} of paper {}", chunk.id, chunk.paper_id);
        inner.chunks.insert(chunk.id.clone(), chunk);
        Ok(())
    }
}

#[async_trait]
impl PaperCatalog for InMemoryChunkStore {
    async fn list_papers(
        &self,
        owner_id: UserId,
        project_id: Option<ProjectId>,
    ) -> Result<Vec<Paper>> {
        let inner = self.inner.read().await;
        let mut papers: Vec<Paper> = inner
            .papers
            .values()
            .filter(|p| p.owner_id == owner_id)
            .filter(|p| project_id.is_none() || p.project_id == project_id)
            .cloned()
            .collect();
        papers.sort_by_key(|p| p.id);
        Ok(papers)
    }

    async fn get_paper(&self, owner_id: UserId, paper_id: PaperId) -> Result<Option<Paper>> {
        Ok(self
            .inner
            .read()
            .await
            .papers
            .get(&paper_id)
            .filter(|p| p.owner_id == owner_id)
            .cloned())
    }

    async fn upsert_paper(&self, paper: Paper) -> Result<()> {
        self.inner.write().await.papers.insert(paper.id, paper);
        Ok(())
    }
}

/// Read a JSONL file into records, reporting the failing line on error.
pub async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = fs::read_to_string(path).await?;
    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|source| StoreError::InvalidRecord {
            path: path.display().to_string(),
            line: i + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn chunk(id: &str, paper: PaperId, project: Option<ProjectId>, owner: UserId) -> Chunk {
        let mut chunk = Chunk::new(id, format!("text {id}"), vec![1.0, 0.0], paper, owner);
        chunk.project_id = project;
        chunk
    }

    async fn seeded() -> InMemoryChunkStore {
        let store = InMemoryChunkStore::new();
        for c in [
            chunk("a", 10, Some(1), 7),
            chunk("b", 10, Some(1), 7),
            chunk("c", 20, Some(2), 7),
            chunk("d", 30, Some(1), 8),
        ] {
            store.upsert_chunk(c).await.unwrap();
        }
        store
    }

    fn ids(chunks: &[Chunk]) -> Vec<&str> {
        let mut ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_scope_queries_are_owner_bound() {
        let store = seeded().await;

        assert_eq!(ids(&store.chunks_for_paper(7, 10).await.unwrap()), vec!["a", "b"]);
        assert_eq!(ids(&store.chunks_for_project(7, 1).await.unwrap()), vec!["a", "b"]);
        assert_eq!(ids(&store.chunks_for_owner(7).await.unwrap()), vec!["a", "b", "c"]);
        assert!(store.chunks_for_paper(7, 30).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_reindexes() {
        let store = seeded().await;
        store.upsert_chunk(chunk("a", 20, Some(2), 7)).await.unwrap();

        assert_eq!(ids(&store.chunks_for_paper(7, 10).await.unwrap()), vec!["b"]);
        assert_eq!(ids(&store.chunks_for_paper(7, 20).await.unwrap()), vec!["a", "c"]);
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn test_load_dir() {
        let dir = TempDir::new().unwrap();
        let chunks = [chunk("a", 10, None, 1), chunk("b", 11, None, 1)]
            .iter()
            .map(|c| serde_json::to_string(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        tokio::fs::write(dir.path().join("chunks.jsonl"), chunks)
            .await
            .unwrap();
        tokio::fs::write(
            dir.path().join("papers.jsonl"),
            r#"{"id":10,"title":"Attention","owner_id":1}"#,
        )
        .await
        .unwrap();

        let store = InMemoryChunkStore::load_dir(dir.path()).await.unwrap();

        assert_eq!(store.len().await, 2);
        let papers = store.list_papers(1, None).await.unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].status, IngestionStatus::Completed);
    }

    #[tokio::test]
    async fn test_load_dir_reports_bad_line() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("chunks.jsonl"), "{\"id\": 1}\n")
            .await
            .unwrap();

        let err = InMemoryChunkStore::load_dir(dir.path()).await.err().unwrap();
        assert!(matches!(err, StoreError::InvalidRecord { line: 1, .. }));
    }
}
