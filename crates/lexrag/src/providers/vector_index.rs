//! Vector index provider trait for storing and searching chunk embeddings

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Chunk, Document};

/// Metadata stored alongside every chunk vector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorMetadata {
    pub document_id: Uuid,
    pub user_id: String,
    pub chunk_index: u32,
    /// Chunk text, truncated to the configured limit
    pub chunk_text: String,
    pub document_title: String,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
}

impl VectorMetadata {
    /// Build metadata for `chunk` of `document`, keeping at most `text_limit` characters of text
    pub fn for_chunk(document: &Document, chunk: &Chunk, text_limit: usize) -> Self {
        Self {
            document_id: document.id,
            user_id: document.user_id.clone(),
            chunk_index: chunk.chunk_index,
            chunk_text: chunk.chunk_text.chars().take(text_limit).collect(),
            document_title: document.display_title().to_string(),
            file_type: document.file_type.clone(),
            created_at: chunk.created_at,
        }
    }
}

/// One vector to write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// `{document_id}-chunk-{chunk_index}`
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// One similarity match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    /// Similarity in [0, 1], higher is closer
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<VectorMetadata>,
}

/// Trait for namespaced vector storage and similarity search.
///
/// Namespaces partition vectors per user; a query never sees vectors
/// from another namespace. Upserting an existing id overwrites it.
///
/// Implementations:
/// - `PineconeIndex`: Pinecone REST API
/// - `InMemoryVectorIndex`: brute-force cosine search
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Insert or overwrite vectors
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<()>;

    /// Nearest neighbours of `vector`, best first, at most `top_k`
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;

    /// Delete vectors by id; unknown ids are ignored
    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<()>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
