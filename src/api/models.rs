//! API data models and error taxonomy

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use thiserror::Error;

/// Body of `POST /videos/:id/transcription`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptionRequestBody {
    pub prompt: Option<String>,
}

/// Structured endpoint errors; each variant renders as `{error: ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing file input.")]
    MissingInput,

    #[error("Invalid input type. Please upload a .mp3 file.")]
    InvalidExtension,

    #[error("Upload exceeds the maximum accepted size.")]
    SizeLimitExceeded,

    #[error("Malformed upload: {0}")]
    Multipart(String),

    #[error("Video not found.")]
    NotFound,

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Internal server error.")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingInput
            | ApiError::InvalidExtension
            | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::SizeLimitExceeded => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Transcription(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref source) = self {
            tracing::error!("internal error: {:#}", source);
        }
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
