//! Error types for the ingestion and retrieval pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input could not be turned into usable text (unreadable, too short, corrupt)
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Document bytes or metadata are missing from storage
    #[error("Storage error: {0}")]
    Storage(String),

    /// Document not found (or not owned by the caller)
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Relational store write/read failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Embedding, chat completion or vector index call failed
    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    /// Structured model output could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Status change that is not in the transition table
    #[error("Invalid {field} transition: {from} -> {to}")]
    InvalidTransition {
        field: &'static str,
        from: String,
        to: String,
    },

    /// The document changed while the stage was running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stage was invoked before its prerequisites were met
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Malformed request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create an external service error
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Machine-readable error code returned to API callers
    pub fn code(&self) -> &'static str {
        match self {
            Error::Extraction(_) | Error::Storage(_) | Error::Persistence(_) => "PROCESSING_FAILED",
            Error::DocumentNotFound(_) => "NOT_FOUND",
            Error::ExternalService { .. } | Error::Http(_) => "EXTERNAL_SERVICE_FAILED",
            Error::Parse(_) => "PARSE_FAILED",
            Error::InvalidTransition { .. } => "INVALID_TRANSITION",
            Error::NotReady(_) => "NOT_READY",
            Error::Conflict(_) => "CONFLICT",
            Error::Validation(_) | Error::Json(_) => "INVALID_REQUEST",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Io(_) | Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether re-invoking the failed stage may succeed without changing the input
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ExternalService { .. } | Error::Http(_) | Error::Persistence(_) | Error::Storage(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Validation(_) | Error::Json(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Error::DocumentNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            Error::NotReady(_) => (StatusCode::CONFLICT, "not_ready"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Error::Extraction(_) => (StatusCode::UNPROCESSABLE_ENTITY, "extraction_error"),
            Error::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            Error::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error"),
            Error::ExternalService { .. } | Error::Http(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "external_service_error")
            }
            Error::Parse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "parse_error"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
                "code": self.code(),
            }
        }));

        (status, body).into_response()
    }
}
