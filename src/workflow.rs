//! Upload-convert-transcribe workflow
//!
//! Drives the client pipeline: convert a selected video to audio, upload the
//! audio, request a transcription. Status moves strictly forward through
//! waiting → converting → uploading → generating → success, with failure
//! reachable from any in-flight step.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Status of a workflow run, observed by the presentation layer.
///
/// Terminal states are `Success` and `Failure`; a new submission is accepted
/// only from `Waiting` or `Failure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowStatus {
    Waiting,
    Converting,
    Uploading,
    Generating,
    Success { video_id: String },
    Failure { detail: String },
}

impl WorkflowStatus {
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowStatus::Waiting => "waiting",
            WorkflowStatus::Converting => "converting",
            WorkflowStatus::Uploading => "uploading",
            WorkflowStatus::Generating => "generating",
            WorkflowStatus::Success { .. } => "success",
            WorkflowStatus::Failure { .. } => "failure",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Success { .. } | WorkflowStatus::Failure { .. }
        )
    }

    /// A run may start from `Waiting`, or restart from `Failure`
    pub fn accepts_submission(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Waiting | WorkflowStatus::Failure { .. }
        )
    }
}

/// Errors raised by a workflow run, one variant per failing step
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("submission rejected while status is '{status}'")]
    SubmissionRejected { status: &'static str },

    #[error("audio conversion failed: {0}")]
    Encoding(String),

    #[error("audio upload failed: {0}")]
    Network(String),

    #[error("transcription request failed: {0}")]
    Transcription(String),
}

/// Converts a selected video into an uploadable audio file
#[async_trait]
pub trait ConvertAudio: Send + Sync {
    async fn convert(&self, video_path: &Path) -> Result<PathBuf>;
}

/// Uploads an audio file and returns the created record id
#[async_trait]
pub trait UploadAudio: Send + Sync {
    async fn upload(&self, audio_path: &Path) -> Result<String>;
}

/// Triggers server-side transcription for an uploaded record
#[async_trait]
pub trait RequestTranscription: Send + Sync {
    async fn request(&self, video_id: &str, prompt: Option<&str>) -> Result<()>;
}

/// Drives one workflow run at a time over the injected steps
pub struct WorkflowRunner {
    converter: Arc<dyn ConvertAudio>,
    uploader: Arc<dyn UploadAudio>,
    requester: Arc<dyn RequestTranscription>,
    status_tx: watch::Sender<WorkflowStatus>,
}

impl WorkflowRunner {
    pub fn new(
        converter: Arc<dyn ConvertAudio>,
        uploader: Arc<dyn UploadAudio>,
        requester: Arc<dyn RequestTranscription>,
    ) -> Self {
        let (status_tx, _) = watch::channel(WorkflowStatus::Waiting);
        Self {
            converter,
            uploader,
            requester,
            status_tx,
        }
    }

    /// Current status snapshot
    pub fn status(&self) -> WorkflowStatus {
        self.status_tx.borrow().clone()
    }

    /// Watch receiver for the presentation layer
    pub fn subscribe(&self) -> watch::Receiver<WorkflowStatus> {
        self.status_tx.subscribe()
    }

    fn set_status(&self, status: WorkflowStatus) {
        debug!("workflow status -> {}", status.label());
        self.status_tx.send_replace(status);
    }

    fn fail(&self, err: WorkflowError) -> WorkflowError {
        error!("workflow run failed: {}", err);
        self.set_status(WorkflowStatus::Failure {
            detail: err.to_string(),
        });
        err
    }

    /// Run the workflow for a selected video.
    ///
    /// Returns `Ok(None)` without any transition when no video is selected
    /// (silent abort, not a failure). On success returns the created record
    /// id, the Rust form of the original completion callback. Steps execute
    /// strictly sequentially; the first error ends the run with `Failure`
    /// and no retry.
    pub async fn run(
        &mut self,
        video_path: Option<&Path>,
        prompt: Option<&str>,
    ) -> Result<Option<String>, WorkflowError> {
        let Some(video_path) = video_path else {
            debug!("no video selected, ignoring submission");
            return Ok(None);
        };

        let current = self.status();
        if !current.accepts_submission() {
            return Err(WorkflowError::SubmissionRejected {
                status: current.label(),
            });
        }

        info!("🚀 Starting workflow run for: {}", video_path.display());

        self.set_status(WorkflowStatus::Converting);
        let audio_path = match self.converter.convert(video_path).await {
            Ok(path) => path,
            Err(e) => return Err(self.fail(WorkflowError::Encoding(e.to_string()))),
        };

        self.set_status(WorkflowStatus::Uploading);
        let upload_result = self.uploader.upload(&audio_path).await;

        // The audio file is transient: once the upload consumed it (or gave
        // up on it), nothing on the client keeps it
        if let Err(e) = tokio::fs::remove_file(&audio_path).await {
            debug!(
                "could not remove intermediate audio {}: {}",
                audio_path.display(),
                e
            );
        }

        let video_id = match upload_result {
            Ok(id) => id,
            Err(e) => return Err(self.fail(WorkflowError::Network(e.to_string()))),
        };

        self.set_status(WorkflowStatus::Generating);
        if let Err(e) = self.requester.request(&video_id, prompt).await {
            return Err(self.fail(WorkflowError::Transcription(e.to_string())));
        }

        self.set_status(WorkflowStatus::Success {
            video_id: video_id.clone(),
        });
        info!("🎉 Workflow completed, record id: {}", video_id);

        Ok(Some(video_id))
    }
}
