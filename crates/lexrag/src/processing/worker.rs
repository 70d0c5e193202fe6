//! Background document processing

use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::Result;

use super::embed::EmbeddingDispatcher;
use super::ingest::IngestionOrchestrator;

/// Runs ingest followed by embed for a document off the request path
#[derive(Clone)]
pub struct DocumentWorker {
    ingestion: Arc<IngestionOrchestrator>,
    embedding: Arc<EmbeddingDispatcher>,
}

impl DocumentWorker {
    pub fn new(ingestion: Arc<IngestionOrchestrator>, embedding: Arc<EmbeddingDispatcher>) -> Self {
        Self {
            ingestion,
            embedding,
        }
    }

    /// Ingest then embed, stopping at the first failed stage.
    ///
    /// Failures are already recorded on the document by the stage itself.
    pub async fn process(&self, document_id: Uuid, user_id: &str) -> Result<()> {
        let ingested = self.ingestion.ingest(document_id, user_id).await?;
        tracing::debug!(
            document_id = %document_id,
            "Ingested {} chunks, embedding",
            ingested.chunks_created
        );

        let embedded = self.embedding.embed(document_id, user_id).await?;
        tracing::info!(
            document_id = %document_id,
            "Document processed: {} chunks, {} vectors",
            ingested.chunks_created,
            embedded.vectors_created
        );
        Ok(())
    }

    /// Spawn [`process`](Self::process) on the runtime
    pub fn spawn_process(&self, document_id: Uuid, user_id: String) -> JoinHandle<()> {
        let worker = self.clone();
        tokio::spawn(async move {
            if let Err(e) = worker.process(document_id, &user_id).await {
                tracing::error!(document_id = %document_id, "Background processing failed: {}", e);
            }
        })
    }

    /// Reset the document now, then process it again in the background.
    ///
    /// Errors from the reset (unknown document, storage failure) are
    /// returned to the caller; later failures only reach the logs and the
    /// document's status fields.
    pub async fn start_reprocess(&self, document_id: Uuid, user_id: &str) -> Result<JoinHandle<()>> {
        self.ingestion.reset(document_id, user_id).await?;
        Ok(self.spawn_process(document_id, user_id.to_string()))
    }
}
