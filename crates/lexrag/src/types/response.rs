//! Response types for the pipeline endpoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::summary::SummaryData;

/// Result of a successful ingestion run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub chunks_created: usize,
}

/// Result of a successful embedding run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmbedResponse {
    pub vectors_created: usize,
}

/// Acknowledgement that reprocessing has been started
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReprocessResponse {
    pub started: bool,
}

/// Generated summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: SummaryData,
}

/// A retrieved chunk cited by an answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    /// Title of the source document
    pub document_title: String,
    /// Preview of the chunk text
    pub chunk_text: String,
    /// Similarity score
    pub score: f32,
    /// Source document ID
    pub document_id: Uuid,
}

/// Answer to a user query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    /// Generated (or canned) answer
    pub answer: String,
    /// Chunks the answer was conditioned on
    pub sources: Vec<Source>,
    /// The question as asked
    pub query: String,
}

impl QueryResponse {
    /// Answer returned when no chunk clears the similarity threshold
    pub const NO_RELEVANT_INFORMATION: &'static str = "I couldn't find any relevant information in your documents to answer that question. Please try rephrasing your query or upload more relevant documents.";

    /// Canned response for an empty retrieval
    pub fn not_found(query: impl Into<String>) -> Self {
        Self {
            answer: Self::NO_RELEVANT_INFORMATION.to_string(),
            sources: Vec::new(),
            query: query.into(),
        }
    }
}
