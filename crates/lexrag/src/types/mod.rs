//! Core types for documents, chunks, queries and responses

pub mod document;
pub mod query;
pub mod response;
pub mod summary;

pub use document::{Chunk, Document, EmbeddingStatus, ProcessingStatus};
pub use query::{ChatMessage, ChatRole, DocumentRequest, QueryRequest};
pub use response::{
    EmbedResponse, IngestResponse, QueryResponse, ReprocessResponse, Source, SummaryResponse,
};
pub use summary::{Risk, RiskLevel, SummaryConfidence, SummaryData};
