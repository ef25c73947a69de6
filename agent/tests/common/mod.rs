//! Shared fixtures for the agent integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use scholar_embeddings::{EmbeddingProvider, EmbeddingRequest, HashingProvider};
use scholar_llm::ScriptedClient;
use scholar_protocol::{Chunk, SectionType};
use scholar_retrieval::{HybridRetriever, RetrievalOutcome, RetrievalRequest, Retriever};
use scholar_store::{
    ChunkStore, InMemoryChunkStore, IngestionJob, Paper, PaperCatalog, QueuedIngestion,
};
use scholar_tools::ResearchToolkit;

/// Counts retrieval calls made through it.
pub struct CountingRetriever {
    inner: HybridRetriever,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Retriever for CountingRetriever {
    async fn retrieve(
        &self,
        request: RetrievalRequest,
    ) -> scholar_retrieval::Result<RetrievalOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.retrieve(request).await
    }
}

pub struct Fixture {
    pub llm: Arc<ScriptedClient>,
    pub retriever: Arc<CountingRetriever>,
    pub store: Arc<InMemoryChunkStore>,
    pub toolkit: ResearchToolkit,
    pub ingestion_queue: UnboundedReceiver<IngestionJob>,
}

impl Fixture {
    pub fn retrievals(&self) -> usize {
        self.retriever.calls.load(Ordering::SeqCst)
    }
}

/// User 1 owns paper 10 in project 1 and paper 20 in project 2. The model
/// replays `replies` in order.
pub async fn fixture(replies: &[&str]) -> Fixture {
    let embedder = Arc::new(HashingProvider::new(64));
    let store = Arc::new(InMemoryChunkStore::new());

    let rows = [
        ("a1", 10, 1, SectionType::Abstract, "We study transformer attention for parsing."),
        ("a2", 10, 1, SectionType::Methods, "The model is trained on the Penn Treebank."),
        ("a3", 10, 1, SectionType::Results, "Parsing accuracy reaches 95 F1."),
        ("b1", 20, 2, SectionType::Methods, "A convolutional network is trained on ImageNet."),
        ("b2", 20, 2, SectionType::Results, "Top-1 accuracy improves by two points."),
    ];
    for (order, (id, paper, project, section, text)) in rows.into_iter().enumerate() {
        let embedding = embedder
            .embed(EmbeddingRequest::new(text))
            .await
            .unwrap()
            .embedding;
        let chunk = Chunk::new(id, text, embedding, paper, 1)
            .with_project(project)
            .with_section(section)
            .with_order(order as u32);
        store.upsert_chunk(chunk).await.unwrap();
    }
    store
        .upsert_paper(Paper::new(10, "Attention Parsing", 1).with_project(1))
        .await
        .unwrap();
    store
        .upsert_paper(Paper::new(20, "Convolutions at Scale", 1).with_project(2))
        .await
        .unwrap();

    let retriever = Arc::new(CountingRetriever {
        inner: HybridRetriever::new(store.clone(), embedder),
        calls: AtomicUsize::new(0),
    });
    let llm = Arc::new(ScriptedClient::new(replies.iter().copied()));
    let (ingestion, ingestion_queue) = QueuedIngestion::new();
    let toolkit = ResearchToolkit::new(
        retriever.clone(),
        store.clone(),
        store.clone(),
        llm.clone(),
        Arc::new(ingestion),
    );

    Fixture {
        llm,
        retriever,
        store,
        toolkit,
        ingestion_queue,
    }
}
