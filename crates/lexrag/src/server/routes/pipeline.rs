//! Pipeline stage endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{
    DocumentRequest, EmbedResponse, IngestResponse, ReprocessResponse, SummaryResponse,
};

/// POST /api/ingest - Extract, sanitize and chunk a document
pub async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<IngestResponse>> {
    request.validate()?;
    let response = state
        .ingestion()
        .ingest(request.document_id, &request.user_id)
        .await?;
    Ok(Json(response))
}

/// POST /api/embed - Embed a chunked document into the user's namespace
pub async fn embed(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<EmbedResponse>> {
    request.validate()?;
    let response = state
        .embedding()
        .embed(request.document_id, &request.user_id)
        .await?;
    Ok(Json(response))
}

/// POST /api/reprocess - Reset a document, then ingest and embed it in the background
pub async fn reprocess(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<ReprocessResponse>> {
    request.validate()?;
    state
        .worker()
        .start_reprocess(request.document_id, &request.user_id)
        .await?;
    Ok(Json(ReprocessResponse { started: true }))
}

/// POST /api/summary - Generate and store a structured summary
pub async fn summary(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<SummaryResponse>> {
    request.validate()?;
    let summary = state
        .summary()
        .generate(request.document_id, &request.user_id)
        .await?;
    Ok(Json(SummaryResponse { summary }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::providers::MockChatProvider;
    use crate::server::build_router;
    use crate::server::tests::test_state;
    use crate::storage::DocumentRepository;
    use crate::test_support::{Fixture, LEASE_TEXT};
    use crate::types::{Chunk, Document, EmbeddingStatus, ProcessingStatus};

    async fn post(router: &Router, path: &str, document_id: Uuid, user_id: &str) -> (StatusCode, serde_json::Value) {
        let body = serde_json::json!({ "documentId": document_id, "userId": user_id });
        let response = router
            .clone()
            .oneshot(
                Request::post(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    async fn lease(fixture: &Fixture) -> Document {
        fixture.upload("user-1", "lease.txt", "text/plain", LEASE_TEXT.as_bytes()).await
    }

    /// Wait for background processing to leave the in-flight states
    async fn settled(fixture: &Fixture, document: &Document) -> Document {
        for _ in 0..500 {
            let current = fixture.reload(document);
            if matches!(
                current.processing_status,
                ProcessingStatus::Ready | ProcessingStatus::Failed
            ) || current.embedding_status == EmbeddingStatus::Failed
            {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("document {} did not settle", document.id);
    }

    #[tokio::test]
    async fn test_ingest_then_embed() {
        let fixture = Fixture::new();
        let document = lease(&fixture).await;
        let router = build_router(test_state(&fixture, MockChatProvider::new()));

        let (status, body) = post(&router, "/api/ingest", document.id, "user-1").await;
        assert_eq!(status, StatusCode::OK);
        let chunks = body["chunksCreated"].as_u64().unwrap();
        assert!(chunks > 0);

        let (status, body) = post(&router, "/api/embed", document.id, "user-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["vectorsCreated"].as_u64().unwrap(), chunks);

        let stored = fixture.reload(&document);
        assert_eq!(stored.processing_status, ProcessingStatus::Ready);
        assert_eq!(stored.embedding_status, EmbeddingStatus::Completed);
        assert_eq!(fixture.vectors.len("user-1"), chunks as usize);
    }

    #[tokio::test]
    async fn test_short_text_is_unprocessable() {
        let fixture = Fixture::new();
        let document = fixture.upload("user-1", "memo.txt", "text/plain", b"too short").await;
        let router = build_router(test_state(&fixture, MockChatProvider::new()));

        let (status, body) = post(&router, "/api/ingest", document.id, "user-1").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "PROCESSING_FAILED");
        assert_eq!(fixture.reload(&document).processing_status, ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn test_embed_before_ingest_conflicts() {
        let fixture = Fixture::new();
        let document = lease(&fixture).await;
        let router = build_router(test_state(&fixture, MockChatProvider::new()));

        let (status, body) = post(&router, "/api/embed", document.id, "user-1").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "NOT_READY");
    }

    #[tokio::test]
    async fn test_other_users_document_is_not_found() {
        let fixture = Fixture::new();
        let document = lease(&fixture).await;
        let router = build_router(test_state(&fixture, MockChatProvider::new()));

        let (status, _) = post(&router, "/api/ingest", document.id, "user-2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(fixture.reload(&document).processing_status, ProcessingStatus::Pending);
    }

    #[tokio::test]
    async fn test_blank_user_is_rejected() {
        let fixture = Fixture::new();
        let document = lease(&fixture).await;
        let router = build_router(test_state(&fixture, MockChatProvider::new()));

        let (status, _) = post(&router, "/api/ingest", document.id, " ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reprocess_replaces_stale_chunks() {
        let fixture = Fixture::new();
        let mut document = lease(&fixture).await;

        let stale: Vec<Chunk> = (0..3)
            .map(|i| Chunk::new(document.id, "user-1", i, format!("stale clause {}", i), 3))
            .collect();
        fixture.repository.insert_chunks(&stale).unwrap();
        document.transition_processing(ProcessingStatus::Processing).unwrap();
        document.transition_processing(ProcessingStatus::Failed).unwrap();
        document.chunks_count = 3;
        document.error_message = Some("embedding service timeout".into());
        fixture.repository.update_document(&document).unwrap();

        let router = build_router(test_state(&fixture, MockChatProvider::new()));
        let (status, body) = post(&router, "/api/reprocess", document.id, "user-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "started": true }));

        let stored = settled(&fixture, &document).await;
        assert_eq!(stored.processing_status, ProcessingStatus::Ready);
        assert_eq!(stored.embedding_status, EmbeddingStatus::Completed);
        assert!(stored.error_message.is_none());

        let rows = fixture.repository.get_chunks(&document.id).unwrap();
        assert_eq!(rows.len(), stored.chunks_count as usize);
        assert!(rows.iter().all(|row| stale.iter().all(|old| old.id != row.id)));
        assert!(rows.iter().all(|row| !row.chunk_text.starts_with("stale")));
        assert_eq!(fixture.vectors.len("user-1"), rows.len());
    }

    #[tokio::test]
    async fn test_reprocess_during_ingest_conflicts() {
        let fixture = Fixture::new();
        let document = lease(&fixture).await;
        assert!(fixture.repository.claim_processing(&document.id).unwrap());
        let router = build_router(test_state(&fixture, MockChatProvider::new()));

        let (status, body) = post(&router, "/api/reprocess", document.id, "user-1").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

        let (status, body) = post(&router, "/api/ingest", document.id, "user-1").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(fixture.reload(&document).processing_status, ProcessingStatus::Processing);
    }

    #[tokio::test]
    async fn test_summary_is_stored() {
        let fixture = Fixture::new();
        let document = lease(&fixture).await;

        let mut chat = MockChatProvider::new();
        chat.expect_model().return_const("gpt-4o-mini".to_string());
        chat.expect_complete().times(1).returning(|_, _| {
            Ok(r#"{"key_clauses": ["Rent due on the first"], "risks": [], "obligations": [], "recommendations": []}"#.to_string())
        });
        let router = build_router(test_state(&fixture, chat));
        post(&router, "/api/ingest", document.id, "user-1").await;

        let (status, body) = post(&router, "/api/summary", document.id, "user-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["key_clauses"][0], "Rent due on the first");
        assert!(fixture.reload(&document).summary_generated);
    }
}
