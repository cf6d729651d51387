//! End-to-end tests for the upload API
//!
//! The router is exercised directly with `oneshot` requests against an
//! in-memory database, a temporary upload directory and a canned
//! transcription collaborator.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use vidscribe::api::{build_router, AppState};
use vidscribe::config::MAX_UPLOAD_BYTES;
use vidscribe::db;
use vidscribe::storage::UploadStore;
use vidscribe::transcription::{TranscribeAudio, TranscriptionError};
use vidscribe::VideoRepository;

const BOUNDARY: &str = "vidscribe-test-boundary";

/// Canned collaborator standing in for the external AI service
struct FakeTranscriber;

#[async_trait]
impl TranscribeAudio for FakeTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        prompt: Option<&str>,
    ) -> Result<String, TranscriptionError> {
        if !audio_path.exists() {
            return Err(TranscriptionError::Audio(
                audio_path.display().to_string(),
            ));
        }
        match prompt {
            Some(prompt) => Ok(format!("transcribed with prompt: {}", prompt)),
            None => Ok("transcribed".to_string()),
        }
    }
}

/// Test helper: build app state over fresh in-memory storage
async fn setup_state(temp_dir: &TempDir) -> AppState {
    let pool = db::connect("sqlite::memory:").await.unwrap();
    let repository = VideoRepository::new(pool);
    let store = UploadStore::new(temp_dir.path()).await.unwrap();

    AppState::new(
        repository,
        store,
        Arc::new(FakeTranscriber),
        MAX_UPLOAD_BYTES,
    )
}

/// Test helper: multipart body with a single file field
fn multipart_file_body(field_name: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field_name, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/mpeg\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/videos")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let app = build_router(setup_state(&temp_dir).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "vidscribe");
    assert_eq!(body["videos"], 0);
}

// =============================================================================
// Upload endpoint
// =============================================================================

#[tokio::test]
async fn test_upload_rejects_wrong_extension() {
    let temp_dir = TempDir::new().unwrap();
    let state = setup_state(&temp_dir).await;
    let app = build_router(state.clone());

    let body = multipart_file_body("file", "lecture.wav", b"not really audio");
    let response = app.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body["error"],
        "Invalid input type. Please upload a .mp3 file."
    );

    // No record and no stored file
    assert_eq!(state.repository.count().await.unwrap(), 0);
    let mut entries = std::fs::read_dir(temp_dir.path()).unwrap();
    assert!(entries.next().is_none());
}

#[tokio::test]
async fn test_upload_extension_check_is_case_sensitive() {
    let temp_dir = TempDir::new().unwrap();
    let app = build_router(setup_state(&temp_dir).await);

    let body = multipart_file_body("file", "lecture.MP3", b"audio bytes");
    let response = app.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let app = build_router(setup_state(&temp_dir).await);

    // A form with no file part at all
    let body = format!("--{}--\r\n", BOUNDARY).into_bytes();
    let response = app.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Missing file input.");
}

#[tokio::test]
async fn test_upload_stores_file_and_creates_record() {
    let temp_dir = TempDir::new().unwrap();
    let state = setup_state(&temp_dir).await;
    let app = build_router(state.clone());

    // 10 MiB payload, comfortably under the limit
    let data = vec![0x55u8; 10 * 1_048_576];
    let body = multipart_file_body("file", "lecture.mp3", &data);
    let response = app.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let video = &body["video"];

    assert_eq!(video["name"], "lecture.mp3");
    assert!(video["id"].is_string());

    // The stored file exists at the reported path with a unique name that
    // keeps the original base
    let path = Path::new(video["path"].as_str().unwrap());
    let basename = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(path.exists());
    assert_ne!(basename, "lecture.mp3");
    assert!(basename.starts_with("lecture - "));
    assert!(basename.ends_with(".mp3"));
    assert_eq!(std::fs::metadata(path).unwrap().len(), data.len() as u64);

    assert_eq!(state.repository.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_uploads_with_identical_names_do_not_collide() {
    let temp_dir = TempDir::new().unwrap();
    let state = setup_state(&temp_dir).await;

    let app_a = build_router(state.clone());
    let app_b = build_router(state.clone());

    let body_a = multipart_file_body("file", "lecture.mp3", b"first upload");
    let body_b = multipart_file_body("file", "lecture.mp3", b"second upload");

    let (response_a, response_b) = tokio::join!(
        app_a.oneshot(upload_request(body_a)),
        app_b.oneshot(upload_request(body_b)),
    );

    let response_a = response_a.unwrap();
    let response_b = response_b.unwrap();
    assert_eq!(response_a.status(), StatusCode::OK);
    assert_eq!(response_b.status(), StatusCode::OK);

    let video_a = extract_json(response_a.into_body()).await["video"].clone();
    let video_b = extract_json(response_b.into_body()).await["video"].clone();

    assert_ne!(video_a["id"], video_b["id"]);
    assert_ne!(video_a["path"], video_b["path"]);
    assert!(Path::new(video_a["path"].as_str().unwrap()).exists());
    assert!(Path::new(video_b["path"].as_str().unwrap()).exists());
    assert_eq!(state.repository.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_upload_over_size_limit_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let state = setup_state(&temp_dir).await;
    let app = build_router(state.clone());

    // One byte over the 25 MiB request cap
    let data = vec![0x55u8; MAX_UPLOAD_BYTES as usize + 1];
    let body = multipart_file_body("file", "lecture.mp3", &data);
    let response = app.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(state.repository.count().await.unwrap(), 0);
}

// =============================================================================
// Transcription endpoint
// =============================================================================

#[tokio::test]
async fn test_transcription_unknown_id_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let app = build_router(setup_state(&temp_dir).await);

    let response = app
        .oneshot(json_request(
            "/videos/no-such-id/transcription",
            serde_json::json!({"prompt": "key points"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Video not found.");
}

#[tokio::test]
async fn test_transcription_for_uploaded_record() {
    let temp_dir = TempDir::new().unwrap();
    let state = setup_state(&temp_dir).await;

    let upload_app = build_router(state.clone());
    let body = multipart_file_body("file", "lecture.mp3", b"audio bytes");
    let response = upload_app.oneshot(upload_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let video = extract_json(response.into_body()).await["video"].clone();
    let id = video["id"].as_str().unwrap().to_string();

    let app = build_router(state);
    let response = app
        .oneshot(json_request(
            &format!("/videos/{}/transcription", id),
            serde_json::json!({"prompt": "summarize the key points"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body["transcription"],
        "transcribed with prompt: summarize the key points"
    );
}

#[tokio::test]
async fn test_transcription_without_prompt() {
    let temp_dir = TempDir::new().unwrap();
    let state = setup_state(&temp_dir).await;

    let upload_app = build_router(state.clone());
    let body = multipart_file_body("file", "lecture.mp3", b"audio bytes");
    let response = upload_app.oneshot(upload_request(body)).await.unwrap();
    let video = extract_json(response.into_body()).await["video"].clone();
    let id = video["id"].as_str().unwrap().to_string();

    let app = build_router(state);
    let response = app
        .oneshot(json_request(
            &format!("/videos/{}/transcription", id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["transcription"], "transcribed");
}
