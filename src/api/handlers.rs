//! API request handlers

use anyhow::Result;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use super::models::{ApiError, TranscriptionRequestBody};
use super::server::AppState;

/// Handle health check requests
pub async fn health_check(state: &AppState) -> Result<Value> {
    let videos = state.repository.count().await?;

    Ok(serde_json::json!({
        "status": "healthy",
        "service": "vidscribe",
        "version": env!("CARGO_PKG_VERSION"),
        "videos": videos,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn map_multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::SizeLimitExceeded
    } else {
        ApiError::Multipart(err.body_text())
    }
}

/// Handle a single-file audio upload.
///
/// Validates the filename suffix, streams the bytes to a unique destination
/// under the upload directory, and only once the file is fully on disk
/// inserts the record returned to the caller.
pub async fn upload_video(state: &AppState, mut multipart: Multipart) -> Result<Value, ApiError> {
    // First field carrying a filename is the upload; everything else is
    // ignored, matching the one-file contract
    let mut field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.file_name().is_some() => break field,
            Ok(Some(_)) => continue,
            Ok(None) => return Err(ApiError::MissingInput),
            Err(e) => return Err(map_multipart_error(e)),
        }
    };

    let filename = field
        .file_name()
        .map(|name| name.to_string())
        .ok_or(ApiError::MissingInput)?;

    // Suffix check only, case-sensitive; content is not sniffed
    let extension = Path::new(&filename).extension().and_then(|ext| ext.to_str());
    if extension != Some("mp3") {
        return Err(ApiError::InvalidExtension);
    }

    let destination = state.store.unique_destination(&filename);
    let mut writer = state
        .store
        .begin(destination)
        .await
        .map_err(ApiError::internal)?;

    loop {
        let chunk = match field.chunk().await {
            Ok(chunk) => chunk,
            Err(e) => {
                writer.abort().await;
                return Err(map_multipart_error(e));
            }
        };

        let Some(chunk) = chunk else { break };

        if let Err(e) = writer.write_chunk(&chunk).await {
            writer.abort().await;
            return Err(ApiError::internal(e));
        }
    }

    // The stream is fully consumed and flushed; only now may the record
    // exist
    let (path, size) = writer.finish().await.map_err(ApiError::internal)?;

    let record = state
        .repository
        .insert(&filename, &path.to_string_lossy())
        .await
        .map_err(ApiError::internal)?;

    info!(
        "📥 Stored upload '{}' as {} ({} bytes), record id: {}",
        filename,
        path.display(),
        size,
        record.id
    );

    Ok(serde_json::json!({ "video": record }))
}

/// Handle a transcription trigger for an uploaded record
pub async fn create_transcription(
    state: &AppState,
    id: &str,
    request: TranscriptionRequestBody,
) -> Result<Value, ApiError> {
    let record = state
        .repository
        .get(id)
        .await
        .map_err(ApiError::internal)?
        .ok_or(ApiError::NotFound)?;

    info!("📝 Transcription requested for record: {}", record.id);

    let transcription = state
        .transcriber
        .transcribe(Path::new(&record.path), request.prompt.as_deref())
        .await
        .map_err(|e| ApiError::Transcription(e.to_string()))?;

    Ok(serde_json::json!({ "transcription": transcription }))
}
