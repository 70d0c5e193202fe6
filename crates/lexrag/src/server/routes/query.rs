//! Question answering endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/query - Answer a question from the user's documents
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    request.validate()?;
    let start = Instant::now();

    tracing::info!("Query: \"{}\"", request.query);

    let response = state
        .retrieval()
        .answer(&request.query, &request.user_id, &request.conversation_history)
        .await?;

    tracing::info!(
        "Query completed in {}ms, {} sources",
        start.elapsed().as_millis(),
        response.sources.len()
    );

    Ok(Json(response))
}
