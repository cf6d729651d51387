//! HTTP server implementation for the upload API

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::handlers;
use super::models::TranscriptionRequestBody;
use crate::db::VideoRepository;
use crate::storage::UploadStore;
use crate::transcription::TranscribeAudio;

/// Shared application state, constructed once at startup and injected into
/// every handler
#[derive(Clone)]
pub struct AppState {
    pub repository: VideoRepository,
    pub store: UploadStore,
    pub transcriber: Arc<dyn TranscribeAudio>,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(
        repository: VideoRepository,
        store: UploadStore,
        transcriber: Arc<dyn TranscribeAudio>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            repository,
            store,
            transcriber,
            max_upload_bytes,
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Configure CORS to allow browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/videos", post(upload_video_handler))
        .route("/videos/:id/transcription", post(create_transcription_handler))
        // Transport-level size cap, applied before any handler logic runs
        .layer(DefaultBodyLimit::max(state.max_upload_bytes as usize))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Configure and start the HTTP server
pub async fn start_http_server(state: AppState, port: u16) -> Result<()> {
    info!("🚀 Starting upload API on port {}", port);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("🌐 API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match handlers::health_check(&state).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

/// Upload handler: one audio file per request
async fn upload_video_handler(
    State(state): State<AppState>,
    multipart: axum::extract::Multipart,
) -> Response {
    match handlers::upload_video(&state, multipart).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Transcription trigger handler
async fn create_transcription_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<TranscriptionRequestBody>>,
) -> Response {
    let request = body.map(|Json(body)| body).unwrap_or_default();

    match handlers::create_transcription(&state, &id, request).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => e.into_response(),
    }
}
