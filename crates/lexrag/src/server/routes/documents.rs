//! Document upload and read endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::processing::load_owned;
use crate::server::state::AppState;
use crate::types::Document;

/// `?userId=` on the read endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub user_id: String,
}

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// POST /api/documents - Store an uploaded file and register a pending document
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>)> {
    let mut file = None;
    let mut user_id = None;
    let mut auto_process = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(base_name)
                    .filter(|s| !matches!(s.as_str(), "" | "." | ".."))
                    .unwrap_or_else(|| format!("upload_{}.bin", Uuid::new_v4()));
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| Error::Validation(format!("Failed to read file: {}", e)))?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "userId" => user_id = Some(text_field(field).await?),
            "auto_process" => {
                let value = text_field(field).await?;
                auto_process = matches!(value.trim(), "true" | "1" | "yes");
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let user_id = user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| Error::Validation("userId is required".into()))?;
    let file = file.ok_or_else(|| Error::Validation("file is required".into()))?;

    let file_type = file
        .content_type
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .unwrap_or_else(|| {
            mime_guess::from_path(&file.filename)
                .first_or_octet_stream()
                .to_string()
        });

    let id = Uuid::new_v4();
    let file_path = format!("{}/{}/{}", user_id, id, file.filename);
    state.blobs().upload(&file_path, &file.data).await?;

    let document = Document::new(
        id,
        user_id.clone(),
        file.filename,
        file_type,
        file.data.len() as u64,
        file_path,
    );
    if let Err(e) = state.repository().insert_document(&document) {
        if let Err(cleanup) = state.blobs().delete(&document.file_path).await {
            tracing::error!(
                document_id = %document.id,
                "Failed to remove blob after rejected insert: {}",
                cleanup
            );
        }
        return Err(e);
    }

    tracing::info!(
        document_id = %document.id,
        "Uploaded {} ({}, {} bytes)",
        document.original_filename,
        document.file_type,
        document.file_size
    );

    if auto_process {
        state.worker().spawn_process(document.id, user_id);
    }

    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /api/documents?userId= - A user's documents, newest first
pub async fn list_documents(
    State(state): State<AppState>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<Vec<Document>>> {
    if owner.user_id.trim().is_empty() {
        return Err(Error::Validation("userId is required".into()));
    }
    Ok(Json(state.repository().list_documents(&owner.user_id)?))
}

/// GET /api/documents/:id?userId= - A document and its stage statuses
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<Document>> {
    let document = load_owned(state.repository().as_ref(), id, &owner.user_id)?;
    Ok(Json(document))
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| Error::Validation(format!("Failed to read form field: {}", e)))
}

/// Last path segment of a client-supplied filename
fn base_name(filename: &str) -> String {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
        .to_string()
}
