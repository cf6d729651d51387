//! HTTP client side of the pipeline
//!
//! `UploadClient` posts the extracted audio as multipart form data;
//! `TranscriptionRequester` triggers server-side transcription for the
//! record the upload created.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::time::Duration;
use tracing::info;
use url::Url;

use crate::config::ClientConfig;
use crate::workflow::{RequestTranscription, UploadAudio};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URL: {0}")]
    BadUrl(#[from] url::ParseError),

    #[error("failed to read audio file {0}")]
    Audio(String),

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected server response: {0}")]
    MalformedResponse(String),
}

async fn error_message(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let message = match response.json::<serde_json::Value>().await {
        Ok(body) => body["error"]
            .as_str()
            .unwrap_or("unknown server error")
            .to_string(),
        Err(_) => "unknown server error".to_string(),
    };
    ClientError::Rejected { status, message }
}

/// Uploads one audio file per call to `POST /videos`
#[derive(Debug, Clone)]
pub struct UploadClient {
    base_url: Url,
    client: reqwest::Client,
}

impl UploadClient {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { base_url, client }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.server_url)?;
        Ok(Self::new(
            base_url,
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    /// Send the audio file as the `file` field of a multipart form and
    /// return the created record id
    pub async fn upload_audio(&self, audio_path: &Path) -> Result<String, ClientError> {
        let audio_data = tokio::fs::read(audio_path)
            .await
            .map_err(|e| ClientError::Audio(format!("{}: {}", audio_path.display(), e)))?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        info!(
            "📤 Uploading {} ({} bytes)",
            file_name,
            audio_data.len()
        );

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(audio_data)
                .file_name(file_name)
                .mime_str("audio/mpeg")?,
        );

        let response = self
            .client
            .post(self.base_url.join("videos")?)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_message(response).await);
        }

        let body: serde_json::Value = response.json().await?;
        let video_id = body["video"]["id"]
            .as_str()
            .ok_or_else(|| {
                ClientError::MalformedResponse("upload response missing video.id".to_string())
            })?
            .to_string();

        info!("✅ Upload accepted, record id: {}", video_id);

        Ok(video_id)
    }
}

#[async_trait]
impl UploadAudio for UploadClient {
    async fn upload(&self, audio_path: &Path) -> Result<String> {
        Ok(self.upload_audio(audio_path).await?)
    }
}

/// Triggers transcription via `POST /videos/{id}/transcription`
#[derive(Debug, Clone)]
pub struct TranscriptionRequester {
    base_url: Url,
    client: reqwest::Client,
}

impl TranscriptionRequester {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { base_url, client }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.server_url)?;
        Ok(Self::new(
            base_url,
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    /// Request transcription for an uploaded record; the prompt field is
    /// omitted when no prompt was given
    pub async fn request_transcription(
        &self,
        video_id: &str,
        prompt: Option<&str>,
    ) -> Result<(), ClientError> {
        let url = self
            .base_url
            .join(&format!("videos/{}/transcription", video_id))?;

        let mut body = serde_json::Map::new();
        if let Some(prompt) = prompt {
            body.insert("prompt".to_string(), serde_json::Value::from(prompt));
        }

        info!("📝 Requesting transcription for record: {}", video_id);

        let response = self.client.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(error_message(response).await);
        }

        info!("✅ Transcription requested for record: {}", video_id);

        Ok(())
    }
}

#[async_trait]
impl RequestTranscription for TranscriptionRequester {
    async fn request(&self, video_id: &str, prompt: Option<&str>) -> Result<()> {
        Ok(self.request_transcription(video_id, prompt).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_clients_from_default_config() {
        let config = Config::default().client;
        assert!(UploadClient::from_config(&config).is_ok());
        assert!(TranscriptionRequester::from_config(&config).is_ok());
    }

    #[test]
    fn test_bad_server_url_is_rejected() {
        let mut config = Config::default().client;
        config.server_url = "not a url".to_string();
        assert!(matches!(
            UploadClient::from_config(&config),
            Err(ClientError::BadUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_missing_audio_file_fails_locally() {
        let client = UploadClient::from_config(&Config::default().client).unwrap();
        let result = client
            .upload_audio(Path::new("/nonexistent/audio.mp3"))
            .await;
        assert!(matches!(result, Err(ClientError::Audio(_))));
    }
}
