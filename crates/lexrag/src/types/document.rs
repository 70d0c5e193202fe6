//! Document and chunk records with their processing state machines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::summary::SummaryData;
use crate::error::{Error, Result};

/// Ingestion progress of a document
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Uploaded, not yet picked up
    #[default]
    Pending,
    /// Extraction and chunking in progress
    Processing,
    /// Chunks persisted; waiting for embeddings
    Chunked,
    /// Chunks embedded and searchable
    Ready,
    /// Ingestion failed; see `error_message`
    Failed,
}

impl ProcessingStatus {
    /// Whether `self -> next` is in the transition table.
    ///
    /// Same-state writes are always allowed. `* -> Pending` is the reset
    /// edge used by reprocessing; a document in `Processing` belongs to a
    /// running ingest and cannot be reset.
    pub fn can_transition_to(self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;

        if self == next {
            return true;
        }

        matches!(
            (self, next),
            (Pending, Processing)
                | (Failed, Processing)
                | (Pending, Failed)
                | (Processing, Chunked)
                | (Processing, Failed)
                | (Chunked, Ready)
                | (Chunked, Pending)
                | (Ready, Pending)
                | (Failed, Pending)
        )
    }

    /// Chunk rows exist for the document
    pub fn has_chunks(self) -> bool {
        matches!(self, ProcessingStatus::Chunked | ProcessingStatus::Ready)
    }

    /// Stable string form used in storage
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Chunked => "chunked",
            ProcessingStatus::Ready => "ready",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "chunked" => Ok(Self::Chunked),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            other => Err(Error::Persistence(format!("Unknown processing status '{}'", other))),
        }
    }
}

/// Embedding progress of a document
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingStatus {
    /// No embeddings requested yet
    #[default]
    Pending,
    /// Embedding requests in flight
    Processing,
    /// All vectors upserted
    Completed,
    /// Embedding failed; retry by re-running the stage
    Failed,
}

impl EmbeddingStatus {
    /// Whether `self -> next` is in the transition table
    pub fn can_transition_to(self, next: EmbeddingStatus) -> bool {
        use EmbeddingStatus::*;

        if self == next {
            return true;
        }

        matches!(
            (self, next),
            (Pending, Processing)
                | (Failed, Processing)
                | (Completed, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Completed, Pending)
                | (Failed, Pending)
        )
    }

    /// Stable string form used in storage
    pub fn as_str(self) -> &'static str {
        match self {
            EmbeddingStatus::Pending => "pending",
            EmbeddingStatus::Processing => "processing",
            EmbeddingStatus::Completed => "completed",
            EmbeddingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for EmbeddingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(Error::Persistence(format!("Unknown embedding status '{}'", other))),
        }
    }
}

/// An uploaded document and its pipeline state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Document ID
    pub id: Uuid,
    /// Owner; also the vector index namespace
    pub user_id: String,
    /// Display title
    pub title: String,
    /// Filename as uploaded
    pub original_filename: String,
    /// Declared MIME type (untrusted)
    pub file_type: String,
    /// Size in bytes
    pub file_size: u64,
    /// Blob storage locator
    pub file_path: String,
    /// Number of chunk rows
    pub chunks_count: u32,
    /// Ingestion status
    pub processing_status: ProcessingStatus,
    /// Embedding status
    pub embedding_status: EmbeddingStatus,
    /// Structured analysis, when generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_data: Option<SummaryData>,
    /// Whether a summary has been generated
    pub summary_generated: bool,
    /// Reason for the last failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Upload time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a pending document for a freshly uploaded file
    pub fn new(
        id: Uuid,
        user_id: impl Into<String>,
        original_filename: impl Into<String>,
        file_type: impl Into<String>,
        file_size: u64,
        file_path: impl Into<String>,
    ) -> Self {
        let original_filename = original_filename.into();
        let now = Utc::now();

        Self {
            id,
            user_id: user_id.into(),
            title: title_from_filename(&original_filename),
            original_filename,
            file_type: file_type.into(),
            file_size,
            file_path: file_path.into(),
            chunks_count: 0,
            processing_status: ProcessingStatus::Pending,
            embedding_status: EmbeddingStatus::Pending,
            summary_data: None,
            summary_generated: false,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move `processing_status` along the transition table
    pub fn transition_processing(&mut self, next: ProcessingStatus) -> Result<()> {
        if !self.processing_status.can_transition_to(next) {
            tracing::warn!(
                document_id = %self.id,
                "Rejected processing_status transition {} -> {}",
                self.processing_status,
                next
            );
            return Err(Error::InvalidTransition {
                field: "processing_status",
                from: self.processing_status.to_string(),
                to: next.to_string(),
            });
        }
        self.processing_status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move `embedding_status` along the transition table.
    ///
    /// Entering `Processing` additionally requires chunks to exist.
    pub fn transition_embedding(&mut self, next: EmbeddingStatus) -> Result<()> {
        let allowed = self.embedding_status.can_transition_to(next)
            && (next != EmbeddingStatus::Processing || self.processing_status.has_chunks());

        if !allowed {
            tracing::warn!(
                document_id = %self.id,
                "Rejected embedding_status transition {} -> {} (processing_status: {})",
                self.embedding_status,
                next,
                self.processing_status
            );
            return Err(Error::InvalidTransition {
                field: "embedding_status",
                from: self.embedding_status.to_string(),
                to: next.to_string(),
            });
        }
        self.embedding_status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Reset to the freshly-uploaded state (reprocessing)
    pub fn reset(&mut self) -> Result<()> {
        let mut reset = self.clone();
        reset.transition_processing(ProcessingStatus::Pending)?;
        reset.transition_embedding(EmbeddingStatus::Pending)?;
        reset.chunks_count = 0;
        reset.summary_data = None;
        reset.summary_generated = false;
        reset.error_message = None;

        *self = reset;
        Ok(())
    }

    /// Title for vector metadata and citations
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }

    /// Owned by `user_id`
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Filename without its extension
fn title_from_filename(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => filename.to_string(),
    }
}

/// A bounded, sanitized slice of a document's text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Chunk ID
    pub id: Uuid,
    /// Owning document
    pub document_id: Uuid,
    /// Owner
    pub user_id: String,
    /// Position in the document (0-based, contiguous)
    pub chunk_index: u32,
    /// Sanitized chunk text
    pub chunk_text: String,
    /// Estimated token count
    pub token_count: usize,
    /// Key of this chunk's vector in the index
    pub pinecone_id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a chunk; the vector key is derived from document and index
    pub fn new(
        document_id: Uuid,
        user_id: impl Into<String>,
        chunk_index: u32,
        chunk_text: String,
        token_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            user_id: user_id.into(),
            chunk_index,
            chunk_text,
            token_count,
            pinecone_id: Self::vector_id(&document_id, chunk_index),
            created_at: Utc::now(),
        }
    }

    /// Deterministic vector key: `{document_id}-chunk-{chunk_index}`
    pub fn vector_id(document_id: &Uuid, chunk_index: u32) -> String {
        format!("{}-chunk-{}", document_id, chunk_index)
    }
}
