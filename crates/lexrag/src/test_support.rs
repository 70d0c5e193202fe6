//! Shared fixtures for unit tests

use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use crate::providers::{BlobStore, InMemoryVectorIndex, LocalBlobStore, MockEmbeddingProvider};
use crate::storage::{DocumentRepository, SqliteRepository};
use crate::types::Document;

/// A plain-text contract of roughly 500 characters
pub const LEASE_TEXT: &str = "This Residential Lease Agreement is entered into by the Landlord and the Tenant. \
The Tenant agrees to pay monthly rent of two thousand dollars on the first day of each month. \
A security deposit equal to one month of rent is due at signing! \
The Landlord is responsible for structural repairs and major appliances. \
The Tenant shall keep the premises clean and shall not sublet without written consent. \
Either party may terminate this agreement with sixty days written notice? \
This agreement is governed by the laws of the State of Oregon.";

/// In-process collaborators backed by SQLite, a temp dir and memory
pub struct Fixture {
    pub repository: Arc<SqliteRepository>,
    pub blobs: Arc<LocalBlobStore>,
    pub vectors: Arc<InMemoryVectorIndex>,
    _dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            repository: Arc::new(SqliteRepository::in_memory().unwrap()),
            blobs: Arc::new(LocalBlobStore::new(dir.path().to_path_buf()).unwrap()),
            vectors: Arc::new(InMemoryVectorIndex::new()),
            _dir: dir,
        }
    }

    /// Store bytes and register a pending document for them
    pub async fn upload(&self, user_id: &str, filename: &str, file_type: &str, data: &[u8]) -> Document {
        let id = Uuid::new_v4();
        let path = format!("{}/{}/{}", user_id, id, filename);
        self.blobs.upload(&path, data).await.unwrap();

        let document = Document::new(id, user_id, filename, file_type, data.len() as u64, path);
        self.repository.insert_document(&document).unwrap();
        document
    }

    pub fn reload(&self, document: &Document) -> Document {
        self.repository.get_document(&document.id).unwrap().unwrap()
    }
}

/// Embedder that maps text to a two-dimensional vector derived from its length
pub fn length_embedder() -> MockEmbeddingProvider {
    let mut embedder = MockEmbeddingProvider::new();
    embedder
        .expect_embed()
        .returning(|text| Ok(vec![text.len() as f32, 1.0]));
    embedder.expect_dimensions().return_const(2usize);
    embedder.expect_name().return_const("mock");
    embedder
}
