//! API routes

pub mod documents;
pub mod pipeline;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Upload gets the larger body limit
        .route(
            "/documents",
            post(documents::upload_document)
                .layer(DefaultBodyLimit::max(max_upload_size))
                .get(documents::list_documents),
        )
        .route("/documents/:id", get(documents::get_document))
        // Pipeline stages
        .route("/ingest", post(pipeline::ingest))
        .route("/embed", post(pipeline::embed))
        .route("/reprocess", post(pipeline::reprocess))
        .route("/summary", post(pipeline::summary))
        // Question answering
        .route("/query", post(query::query))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "lexrag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Legal document ingestion and retrieval-augmented question answering",
        "endpoints": {
            "POST /api/documents": "Upload a document (multipart: file, userId, auto_process)",
            "GET /api/documents?userId=": "List a user's documents, newest first",
            "GET /api/documents/:id?userId=": "Get a document and its stage statuses",
            "POST /api/ingest": "Extract, sanitize and chunk a document",
            "POST /api/embed": "Embed a chunked document into the vector index",
            "POST /api/reprocess": "Reset a document and process it again in the background",
            "POST /api/summary": "Generate a structured legal summary",
            "POST /api/query": "Answer a question from the user's documents"
        }
    }))
}
