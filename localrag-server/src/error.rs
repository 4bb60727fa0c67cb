//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use localrag::RagError;
use serde_json::json;
use thiserror::Error;

/// An error returned by a request handler.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Rag(#[from] RagError),

    /// The request itself was malformed.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Rag(err) => status_for(err),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Map a pipeline error onto an HTTP status.
pub fn status_for(err: &RagError) -> StatusCode {
    match err {
        RagError::ExtractionError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RagError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
        RagError::ConfigError(_) | RagError::ChunkingError(_) => StatusCode::BAD_REQUEST,
        RagError::EmbeddingError { .. }
        | RagError::GenerationError { .. }
        | RagError::VectorStoreError { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
