//! Embedding dispatch: persisted chunks to vectors in the user's namespace

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorIndexProvider, VectorMetadata, VectorRecord};
use crate::storage::DocumentRepository;
use crate::types::{Chunk, Document, EmbedResponse, EmbeddingStatus, ProcessingStatus};

use super::load_owned;

/// Embeds a chunked document and upserts its vectors
pub struct EmbeddingDispatcher {
    repository: Arc<dyn DocumentRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorIndexProvider>,
    /// In-flight embedding requests (1 = sequential)
    concurrency: usize,
    metadata_text_limit: usize,
}

impl EmbeddingDispatcher {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorIndexProvider>,
        concurrency: usize,
        metadata_text_limit: usize,
    ) -> Self {
        Self {
            repository,
            embedder,
            vectors,
            concurrency: concurrency.max(1),
            metadata_text_limit,
        }
    }

    /// Embed every chunk of a document and upsert the vectors under `user_id`.
    ///
    /// A document that has not been chunked yields `Error::NotReady` and is
    /// left untouched. On any later failure `embedding_status` becomes
    /// `failed` while `processing_status` keeps its value.
    pub async fn embed(&self, document_id: Uuid, user_id: &str) -> Result<EmbedResponse> {
        let mut document = load_owned(self.repository.as_ref(), document_id, user_id)?;

        if !document.processing_status.has_chunks() {
            tracing::warn!(
                document_id = %document_id,
                "Embedding requested before chunking (processing_status: {})",
                document.processing_status
            );
            return Err(Error::NotReady(format!(
                "Document {} has no chunks yet (processing_status: {})",
                document_id, document.processing_status
            )));
        }

        let chunks = self.repository.get_chunks(&document_id)?;
        if chunks.is_empty() {
            return Err(Error::NotReady(format!("Document {} has no chunks", document_id)));
        }

        document.transition_embedding(EmbeddingStatus::Processing)?;
        self.store(&document)?;

        tracing::info!(
            document_id = %document_id,
            "Embedding {} chunks with {} into {}",
            chunks.len(),
            self.embedder.name(),
            self.vectors.name()
        );

        let result = match self.run(&document, &chunks).await {
            Ok(vectors_created) => self.finish(&mut document, vectors_created),
            Err(e) => Err(e),
        };

        match result {
            Ok(vectors_created) => {
                tracing::info!(document_id = %document_id, "Embedding complete: {} vectors", vectors_created);
                Ok(EmbedResponse { vectors_created })
            }
            Err(e) => {
                self.record_failure(&mut document, &e);
                Err(e)
            }
        }
    }

    async fn run(&self, document: &Document, chunks: &[Chunk]) -> Result<usize> {
        let requests = chunks.iter().map(|chunk| {
            let embedder = Arc::clone(&self.embedder);
            let text = chunk.chunk_text.clone();
            let (document_id, index) = (document.id, chunk.chunk_index);
            async move {
                tracing::debug!(document_id = %document_id, "Embedding chunk {}", index);
                embedder.embed(&text).await
            }
        }).collect::<Vec<_>>();

        let embeddings: Vec<Vec<f32>> = stream::iter(requests)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, values)| VectorRecord {
                id: chunk.pinecone_id.clone(),
                values,
                metadata: VectorMetadata::for_chunk(document, chunk, self.metadata_text_limit),
            })
            .collect();

        self.vectors.upsert(&document.user_id, &records).await?;
        Ok(records.len())
    }

    fn finish(&self, document: &mut Document, vectors_created: usize) -> Result<usize> {
        let mut finished = document.clone();
        finished.transition_embedding(EmbeddingStatus::Completed)?;
        finished.transition_processing(ProcessingStatus::Ready)?;
        finished.error_message = None;
        self.store_if(&finished, document.processing_status)?;

        *document = finished;
        Ok(vectors_created)
    }

    fn record_failure(&self, document: &mut Document, error: &Error) {
        tracing::error!(document_id = %document.id, "Embedding failed: {}", error);

        if document.transition_embedding(EmbeddingStatus::Failed).is_err() {
            return;
        }
        document.error_message = Some(error.to_string());

        if let Err(e) = self.store(document) {
            tracing::error!(document_id = %document.id, "Failed to record embedding failure: {}", e);
        }
    }

    /// Write the document unless its `processing_status` changed underneath
    fn store(&self, document: &Document) -> Result<()> {
        self.store_if(document, document.processing_status)
    }

    fn store_if(&self, document: &Document, expected: ProcessingStatus) -> Result<()> {
        if self.repository.update_document_if(document, expected)? {
            Ok(())
        } else {
            Err(Error::Conflict(format!(
                "Document {} is no longer {}",
                document.id, expected
            )))
        }
    }
}
