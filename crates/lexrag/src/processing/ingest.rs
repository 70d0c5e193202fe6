//! Document ingestion: bytes to persisted chunks

use std::sync::Arc;
use uuid::Uuid;

use crate::config::{ChunkingConfig, ExtractionConfig};
use crate::error::{Error, Result};
use crate::ingestion::{estimate_tokens, sanitize, TextChunker, TextExtractor};
use crate::providers::{BlobStore, VectorIndexProvider};
use crate::storage::DocumentRepository;
use crate::types::{Chunk, Document, EmbeddingStatus, IngestResponse, ProcessingStatus};

use super::load_owned;

/// Runs extraction, sanitization and chunking for one document
pub struct IngestionOrchestrator {
    repository: Arc<dyn DocumentRepository>,
    blobs: Arc<dyn BlobStore>,
    vectors: Arc<dyn VectorIndexProvider>,
    extractor: TextExtractor,
    chunker: TextChunker,
    min_text_length: usize,
}

impl IngestionOrchestrator {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        blobs: Arc<dyn BlobStore>,
        vectors: Arc<dyn VectorIndexProvider>,
        extraction: &ExtractionConfig,
        chunking: &ChunkingConfig,
    ) -> Self {
        Self {
            repository,
            blobs,
            vectors,
            extractor: TextExtractor::from_config(extraction),
            chunker: TextChunker::from_config(chunking),
            min_text_length: extraction.min_text_length,
        }
    }

    /// Ingest a document: `pending`/`failed` -> `processing` -> `chunked`.
    ///
    /// The move to `processing` is an atomic claim, so only one caller
    /// ingests a document at a time; the others get `Error::Conflict`.
    /// Any failure after the claim leaves the document `failed` with the
    /// reason in `error_message`.
    pub async fn ingest(&self, document_id: Uuid, user_id: &str) -> Result<IngestResponse> {
        let mut document = load_owned(self.repository.as_ref(), document_id, user_id)?;

        document.transition_processing(ProcessingStatus::Processing)?;
        if !self.repository.claim_processing(&document_id)? {
            tracing::warn!(document_id = %document_id, "Ingestion already claimed elsewhere");
            return Err(Error::Conflict(format!(
                "Document {} is already being ingested or has moved on",
                document_id
            )));
        }
        document.error_message = None;

        tracing::info!(
            document_id = %document_id,
            "Ingesting '{}' ({}, {} bytes)",
            document.original_filename,
            document.file_type,
            document.file_size
        );

        match self.run(&mut document).await {
            Ok(chunks_created) => {
                tracing::info!(document_id = %document_id, "Ingestion complete: {} chunks", chunks_created);
                Ok(IngestResponse { chunks_created })
            }
            Err(e) => {
                self.record_failure(&mut document, &e);
                Err(e)
            }
        }
    }

    async fn run(&self, document: &mut Document) -> Result<usize> {
        // A failed earlier attempt may have left rows behind
        let leftover = self.repository.delete_chunks(&document.id)?;
        if leftover > 0 {
            tracing::debug!(document_id = %document.id, "Removed {} leftover chunks", leftover);
        }

        let bytes = self.blobs.download(&document.file_path).await?;

        let raw = self.extractor.extract(&bytes, &document.file_type)?;
        let text = sanitize(&raw);

        if text.is_empty() {
            return Err(Error::extraction("Document contains no readable text"));
        }
        let length = text.chars().count();
        if length < self.min_text_length {
            return Err(Error::extraction(format!(
                "Extracted text is too short for meaningful analysis ({} < {} characters)",
                length, self.min_text_length
            )));
        }

        let chunks: Vec<Chunk> = self
            .chunker
            .chunk(&text)
            .iter()
            .map(|piece| sanitize(piece))
            .filter(|piece| !piece.is_empty())
            .enumerate()
            .map(|(index, chunk_text)| {
                let token_count = estimate_tokens(&chunk_text);
                Chunk::new(document.id, &document.user_id, index as u32, chunk_text, token_count)
            })
            .collect();

        if chunks.is_empty() {
            return Err(Error::extraction("Chunking produced no chunks"));
        }

        for chunk in &chunks {
            tracing::debug!(
                document_id = %document.id,
                "Chunk {}: {} tokens",
                chunk.chunk_index,
                chunk.token_count
            );
        }

        self.repository.insert_chunks(&chunks)?;

        let mut finished = document.clone();
        finished.chunks_count = chunks.len() as u32;
        finished.transition_processing(ProcessingStatus::Chunked)?;
        finished.transition_embedding(EmbeddingStatus::Pending)?;

        let stored = self
            .repository
            .update_document_if(&finished, ProcessingStatus::Processing)
            .and_then(|updated| {
                if updated {
                    Ok(())
                } else {
                    Err(Error::Conflict(format!(
                        "Document {} left processing during ingestion",
                        document.id
                    )))
                }
            });

        if let Err(e) = stored {
            if let Err(cleanup) = self.repository.delete_chunks(&document.id) {
                tracing::error!(
                    document_id = %document.id,
                    "Failed to remove chunks after status update failure: {}",
                    cleanup
                );
            }
            return Err(e);
        }

        *document = finished;
        Ok(chunks.len())
    }

    fn record_failure(&self, document: &mut Document, error: &Error) {
        tracing::error!(document_id = %document.id, "Ingestion failed: {}", error);

        if document.transition_processing(ProcessingStatus::Failed).is_err() {
            return;
        }
        document.error_message = Some(error.to_string());

        match self.repository.update_document_if(document, ProcessingStatus::Processing) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(document_id = %document.id, "Document left processing; failure not recorded");
            }
            Err(e) => {
                tracing::error!(document_id = %document.id, "Failed to record ingestion failure: {}", e);
            }
        }
    }

    /// Delete chunks and their vectors, then reset both statuses to `pending`.
    ///
    /// A document with a stage in flight is rejected; the row write and
    /// chunk delete only apply if neither status changed since it was read.
    pub async fn reset(&self, document_id: Uuid, user_id: &str) -> Result<Document> {
        let mut document = load_owned(self.repository.as_ref(), document_id, user_id)?;
        let observed = (document.processing_status, document.embedding_status);
        document.reset()?;

        let stale = self.repository.get_chunks(&document_id)?;
        if !stale.is_empty() {
            let ids: Vec<String> = stale.iter().map(|c| c.pinecone_id.clone()).collect();
            if let Err(e) = self.vectors.delete(user_id, &ids).await {
                tracing::warn!(
                    document_id = %document_id,
                    "Could not delete {} stale vectors from {}: {}",
                    ids.len(),
                    self.vectors.name(),
                    e
                );
            }
        }

        let removed = self
            .repository
            .reset_document(&document, observed.0, observed.1)?
            .ok_or_else(|| {
                Error::Conflict(format!("Document {} changed while being reset", document_id))
            })?;

        tracing::info!(document_id = %document_id, "Reset for reprocessing ({} chunks removed)", removed);
        Ok(document)
    }

    /// Reset and ingest again
    pub async fn reprocess(&self, document_id: Uuid, user_id: &str) -> Result<IngestResponse> {
        self.reset(document_id, user_id).await?;
        self.ingest(document_id, user_id).await
    }
}
