//! Application state for the HTTP server

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{RagConfig, VectorIndexBackend};
use crate::error::Result;
use crate::generation::SummaryGenerator;
use crate::processing::{DocumentWorker, EmbeddingDispatcher, IngestionOrchestrator};
use crate::providers::{
    BlobStore, ChatProvider, EmbeddingProvider, InMemoryVectorIndex, LocalBlobStore,
    OpenAiClient, PineconeIndex, VectorIndexProvider,
};
use crate::retrieval::RetrievalQueryService;
use crate::storage::{DocumentRepository, SqliteRepository};

/// External collaborators the pipeline is wired from
#[derive(Clone)]
pub struct Collaborators {
    pub repository: Arc<dyn DocumentRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub chat: Arc<dyn ChatProvider>,
    pub vectors: Arc<dyn VectorIndexProvider>,
}

impl Collaborators {
    /// Build the configured implementations
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let repository = Arc::new(SqliteRepository::new(&config.storage.database_path)?);
        tracing::info!("Database ready at {}", config.storage.database_path.display());

        let blobs = Arc::new(LocalBlobStore::new(config.storage.blob_dir.clone())?);
        tracing::info!("Blob storage at {}", config.storage.blob_dir.display());

        let openai = Arc::new(OpenAiClient::new(&config.llm)?);
        tracing::info!(
            "Using {} (embeddings: {}, chat: {})",
            config.llm.base_url,
            config.llm.embed_model,
            config.llm.chat_model
        );

        let vectors: Arc<dyn VectorIndexProvider> = match config.vector_index.backend {
            VectorIndexBackend::Memory => {
                tracing::warn!("Using in-memory vector index; vectors are lost on restart");
                Arc::new(InMemoryVectorIndex::new())
            }
            VectorIndexBackend::Pinecone => Arc::new(PineconeIndex::new(&config.vector_index)?),
        };

        Ok(Self {
            repository,
            blobs,
            embedder: openai.clone(),
            chat: openai,
            vectors,
        })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    collaborators: Collaborators,
    ingestion: Arc<IngestionOrchestrator>,
    embedding: Arc<EmbeddingDispatcher>,
    worker: DocumentWorker,
    retrieval: RetrievalQueryService,
    summary: SummaryGenerator,
    ready: AtomicBool,
}

impl AppState {
    /// Create state from configuration
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing application state...");
        let collaborators = Collaborators::from_config(&config)?;
        Ok(Self::with_collaborators(config, collaborators))
    }

    /// Wire the pipeline from explicit collaborators
    pub fn with_collaborators(config: RagConfig, collaborators: Collaborators) -> Self {
        let ingestion = Arc::new(IngestionOrchestrator::new(
            collaborators.repository.clone(),
            collaborators.blobs.clone(),
            collaborators.vectors.clone(),
            &config.extraction,
            &config.chunking,
        ));

        let embedding = Arc::new(EmbeddingDispatcher::new(
            collaborators.repository.clone(),
            collaborators.embedder.clone(),
            collaborators.vectors.clone(),
            config.processing.embedding_concurrency,
            config.vector_index.metadata_text_limit,
        ));

        let worker = DocumentWorker::new(ingestion.clone(), embedding.clone());

        let retrieval = RetrievalQueryService::new(
            collaborators.embedder.clone(),
            collaborators.vectors.clone(),
            collaborators.chat.clone(),
            config.retrieval.clone(),
            &config.llm,
        );

        let summary = SummaryGenerator::new(
            collaborators.repository.clone(),
            collaborators.chat.clone(),
            config.summary.clone(),
        );

        tracing::info!(
            "Pipeline wired (embedder: {}, vector index: {}, blobs: {})",
            collaborators.embedder.name(),
            collaborators.vectors.name(),
            collaborators.blobs.name()
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                collaborators,
                ingestion,
                embedding,
                worker,
                retrieval,
                summary,
                ready: AtomicBool::new(true),
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn repository(&self) -> &Arc<dyn DocumentRepository> {
        &self.inner.collaborators.repository
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.inner.collaborators.blobs
    }

    pub fn ingestion(&self) -> &IngestionOrchestrator {
        &self.inner.ingestion
    }

    pub fn embedding(&self) -> &EmbeddingDispatcher {
        &self.inner.embedding
    }

    pub fn worker(&self) -> &DocumentWorker {
        &self.inner.worker
    }

    pub fn retrieval(&self) -> &RetrievalQueryService {
        &self.inner.retrieval
    }

    pub fn summary(&self) -> &SummaryGenerator {
        &self.inner.summary
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Relaxed)
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        self.inner.ready.store(ready, Ordering::Relaxed);
    }
}
