//! Pipeline stages: ingestion, embedding and background processing

mod embed;
mod ingest;
mod worker;

pub use embed::EmbeddingDispatcher;
pub use ingest::IngestionOrchestrator;
pub use worker::DocumentWorker;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::DocumentRepository;
use crate::types::Document;

/// Load a document, treating one owned by someone else as missing
pub(crate) fn load_owned(
    repository: &dyn DocumentRepository,
    document_id: Uuid,
    user_id: &str,
) -> Result<Document> {
    match repository.get_document(&document_id)? {
        Some(document) if document.is_owned_by(user_id) => Ok(document),
        Some(_) => {
            tracing::warn!(document_id = %document_id, "Document requested by a user who does not own it");
            Err(Error::DocumentNotFound(document_id.to_string()))
        }
        None => Err(Error::DocumentNotFound(document_id.to_string())),
    }
}
