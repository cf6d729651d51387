//! AI transcription collaborator
//!
//! The backend treats transcription as an external service behind a trait;
//! the production implementation talks to an OpenAI-compatible
//! `audio/transcriptions` endpoint.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::time::Duration;
use tracing::info;

use crate::config::TranscriptionConfig;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("transcription API key not configured")]
    MissingApiKey,

    #[error("failed to read audio file {0}")]
    Audio(String),

    #[error("transcription request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("transcription service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("transcription response missing text field")]
    MalformedResponse,
}

/// Produces a transcription for a stored audio file
#[async_trait]
pub trait TranscribeAudio: Send + Sync {
    async fn transcribe(
        &self,
        audio_path: &Path,
        prompt: Option<&str>,
    ) -> Result<String, TranscriptionError>;
}

/// OpenAI-compatible transcription client
pub struct OpenAiTranscriber {
    config: TranscriptionConfig,
    client: reqwest::Client,
}

impl OpenAiTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl TranscribeAudio for OpenAiTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        prompt: Option<&str>,
    ) -> Result<String, TranscriptionError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(TranscriptionError::MissingApiKey)?;

        info!("🤖 Requesting transcription for: {}", audio_path.display());

        let audio_data = tokio::fs::read(audio_path)
            .await
            .map_err(|e| TranscriptionError::Audio(format!("{}: {}", audio_path.display(), e)))?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio_data)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")?,
            )
            .text("model", self.config.model.clone())
            .text("temperature", self.config.temperature.to_string())
            .text("response_format", "json");

        if let Some(prompt) = prompt {
            form = form.text("prompt", prompt.to_string());
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api { status, body });
        }

        let response_json: serde_json::Value = response.json().await?;
        let text = response_json["text"]
            .as_str()
            .ok_or(TranscriptionError::MalformedResponse)?
            .to_string();

        info!("✅ Transcription completed: {} characters", text.len());

        Ok(text)
    }
}
