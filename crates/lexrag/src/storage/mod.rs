//! Persistent storage for documents and chunks

mod repository;

pub use repository::{DocumentRepository, SqliteRepository};

#[cfg(test)]
pub use repository::MockDocumentRepository;
