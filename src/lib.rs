/// vidscribe
///
/// Video upload and AI transcription pipeline: extract the audio track of a
/// video with ffmpeg, upload it to the backend, and request a transcription.
pub mod api;
pub mod audio;
pub mod client;
pub mod config;
pub mod db;
pub mod storage;
pub mod transcription;
pub mod workflow;

// Re-export main types for easy access
pub use crate::api::{ApiServer, AppState};
pub use crate::audio::{AudioExtractor, AudioInfo, FfmpegConverter};
pub use crate::client::{TranscriptionRequester, UploadClient};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::db::{VideoRecord, VideoRepository};
pub use crate::storage::UploadStore;
pub use crate::transcription::{OpenAiTranscriber, TranscribeAudio};
pub use crate::workflow::{WorkflowError, WorkflowRunner, WorkflowStatus};
