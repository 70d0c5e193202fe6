//! lexrag: ingestion, chunking, embedding and retrieval-augmented answers over legal documents
//!
//! Uploaded files move through a staged pipeline: text extraction (plain text
//! or PDF, with a salvage pass for damaged PDFs), sanitization, sentence-aware
//! chunking with overlap, embedding into a per-user vector namespace, and
//! question answering grounded in the retrieved chunks. Each stage records its
//! progress on the document so callers can poll or retry.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, Document, EmbeddingStatus, ProcessingStatus},
    query::QueryRequest,
    response::{QueryResponse, Source},
};
