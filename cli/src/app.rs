//! Builds the assistant from configuration.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::info;

use scholar_agent::{Assistant, Router};
use scholar_embeddings::{EmbeddingProvider, HashingProvider, OpenAIProvider};
use scholar_llm::{CompletionClient, ScriptedClient, build_client};
use scholar_retrieval::HybridRetriever;
use scholar_store::{
    FileTranscripts, InMemoryCache, InMemoryChunkStore, IngestionJob, QueuedIngestion,
};
use scholar_tools::ResearchToolkit;

use crate::config::{AppConfig, EmbeddingBackend, EmbeddingSettings};

/// The wired-up services.
pub struct App {
    pub assistant: Assistant,
    pub retriever: Arc<HybridRetriever>,
    pub cache: Arc<InMemoryCache>,
    ingestion_worker: JoinHandle<()>,
}

impl App {
    /// Build every service from `config`. `llm` replaces the configured
    /// completion provider when given.
    pub async fn build(config: &AppConfig, llm: Option<Arc<dyn CompletionClient>>) -> Result<Self> {
        let store = Arc::new(
            InMemoryChunkStore::load_dir(&config.data_dir)
                .await
                .with_context(|| {
                    format!("failed to load papers from {}", config.data_dir.display())
                })?,
        );
        let embedder = embedding_provider(&config.embeddings);
        let retriever = Arc::new(
            HybridRetriever::new(store.clone(), embedder).with_config(config.retrieval.clone()),
        );

        let llm = match llm {
            Some(llm) => llm,
            None => build_client(&config.llm).context("failed to build the completion client")?,
        };

        let cache = Arc::new(InMemoryCache::new(config.cache.max_entries));
        let (ingestion, jobs) = QueuedIngestion::new();
        let ingestion_worker = tokio::spawn(log_ingestion_jobs(jobs));

        let toolkit = ResearchToolkit::new(
            retriever.clone(),
            store.clone(),
            store,
            llm.clone(),
            Arc::new(ingestion),
        )
        .with_cache(cache.clone(), config.cache.ttl());
        let router = Router::new(toolkit, llm, config.router.clone())?;

        let transcripts_dir = config.transcripts_dir();
        let transcripts = FileTranscripts::open(&transcripts_dir)
            .await
            .with_context(|| format!("failed to open {}", transcripts_dir.display()))?;
        info!("Transcripts are kept in {}", transcripts_dir.display());

        Ok(Self {
            assistant: Assistant::new(router, Arc::new(transcripts)),
            retriever,
            cache,
            ingestion_worker,
        })
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.ingestion_worker.abort();
    }
}

fn embedding_provider(settings: &EmbeddingSettings) -> Arc<dyn EmbeddingProvider> {
    match settings.backend {
        EmbeddingBackend::OpenAI => {
            let mut provider = OpenAIProvider::new();
            if let Some(key) = settings
                .api_key_env
                .as_deref()
                .and_then(|name| std::env::var(name).ok())
            {
                provider = provider.with_api_key(key);
            }
            if let Some(model) = &settings.model {
                provider = provider.with_model(model);
            }
            if let Some(url) = &settings.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        EmbeddingBackend::Hashing => Arc::new(HashingProvider::new(settings.dimension)),
    }
}

/// Jobs are handed to an external pipeline; this process only records that
/// they were queued.
async fn log_ingestion_jobs(mut jobs: UnboundedReceiver<IngestionJob>) {
    while let Some(job) = jobs.recv().await {
        info!(
            "Queued ingestion job {} for user {}: {}",
            job.id, job.owner_id, job.request.source
        );
    }
}

/// Read canned model replies, one JSON decision per non-empty line.
pub async fn replay_client(path: &Path) -> Result<Arc<ScriptedClient>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let replies = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());
    Ok(Arc::new(ScriptedClient::new(replies)))
}
