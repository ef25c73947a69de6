//! Ingestion contract.
//!
//! Parsing, chunking and embedding happen in an external pipeline. The core
//! only issues a start request and later polls the job status; it never waits
//! for ingestion to finish.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use scholar_protocol::{PaperId, ProjectId, UserId};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Lifecycle of an ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl IngestionStatus {
    /// Whether the job will not change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A request to ingest one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionRequest {
    /// Path or URL of the source file.
    pub source: String,

    /// Title to record for the paper, if known.
    pub title: Option<String>,

    /// Project to file the paper under.
    pub project_id: Option<ProjectId>,
}

/// A tracked ingestion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionJob {
    /// Job identifier.
    pub id: String,

    /// Requesting user.
    pub owner_id: UserId,

    /// The original request.
    pub request: IngestionRequest,

    /// Current status.
    pub status: IngestionStatus,

    /// Paper produced by the job, once known.
    pub paper_id: Option<PaperId>,

    /// Failure description for `Failed` jobs.
    pub error: Option<String>,

    /// When the job was accepted.
    pub created_at: DateTime<Utc>,

    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

/// Starts ingestion jobs and reports their status.
#[async_trait]
pub trait IngestionService: Send + Sync {
    /// Accept a job. Returns immediately with a `Pending` job.
    async fn start(&self, owner_id: UserId, request: IngestionRequest) -> Result<IngestionJob>;

    /// Current state of a job owned by `owner_id`.
    async fn status(&self, owner_id: UserId, job_id: &str) -> Result<IngestionJob>;
}

/// In-process job table that hands accepted jobs to a worker over a channel.
#[derive(Clone)]
pub struct QueuedIngestion {
    jobs: Arc<RwLock<HashMap<String, IngestionJob>>>,
    queue: mpsc::UnboundedSender<IngestionJob>,
}

impl QueuedIngestion {
    /// Create the service and the receiving end a worker drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<IngestionJob>) {
        let (queue, receiver) = mpsc::unbounded_channel();
        let service = Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            queue,
        };
        (service, receiver)
    }

    /// Record a status change reported by the worker.
    pub async fn update(
        &self,
        job_id: &str,
        status: IngestionStatus,
        paper_id: Option<PaperId>,
        error: Option<String>,
    ) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(format!("ingestion job {job_id}")))?;
        job.status = status;
        if paper_id.is_some() {
            job.paper_id = paper_id;
        }
        job.error = error;
        job.updated_at = Utc::now();
        debug!("Ingestion job {job_id} is now {status}");
        Ok(())
    }
}

#[async_trait]
impl IngestionService for QueuedIngestion {
    async fn start(&self, owner_id: UserId, request: IngestionRequest) -> Result<IngestionJob> {
        let now = Utc::now();
        let job = IngestionJob {
            id: Uuid::new_v4().to_string(),
            owner_id,
            request,
            status: IngestionStatus::Pending,
            paper_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        };

        self.jobs.write().await.insert(job.id.clone(), job.clone());
        self.queue
            .send(job.clone())
            .map_err(|_| StoreError::Unavailable("ingestion worker is not running".to_string()))?;

        info!("Queued ingestion job {} for {}", job.id, job.request.source);
        Ok(job)
    }

    async fn status(&self, owner_id: UserId, job_id: &str) -> Result<IngestionJob> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .filter(|job| job.owner_id == owner_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("ingestion job {job_id}")))
    }
}
