use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::AudioConfig;
use crate::workflow::ConvertAudio;

/// Audio information for an extracted file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    pub path: PathBuf,
    pub duration: Duration,
    pub sample_rate: u32,
    pub format: String,
    pub bitrate: Option<u32>,
    pub file_size: u64,
}

/// Extracts the audio track of a video into a compressed MP3
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    /// Target audio bitrate (encoder form, e.g. "20k")
    pub bitrate: String,
    /// Audio codec used for encoding
    pub codec: String,
    /// Target container format
    pub target_format: String,
}

impl AudioExtractor {
    pub fn new() -> Self {
        Self {
            bitrate: "20k".to_string(),
            codec: "libmp3lame".to_string(),
            target_format: "mp3".to_string(),
        }
    }

    pub fn from_config(config: &AudioConfig) -> Self {
        Self {
            bitrate: config.bitrate.clone(),
            codec: config.codec.clone(),
            target_format: config.target_format.clone(),
        }
    }

    /// Extract the audio stream of a video into an MP3 suitable for upload.
    ///
    /// Selects the audio stream via stream mapping and encodes at the
    /// configured bitrate. Any encoder failure discards the partial output.
    pub async fn extract_audio(&self, video_path: &Path, output_dir: &Path) -> Result<PathBuf> {
        let filename = video_path
            .file_stem()
            .ok_or_else(|| anyhow!("Invalid video filename"))?
            .to_string_lossy();

        let audio_path = output_dir.join(format!("{}.{}", filename, self.target_format));

        info!("🎵 Extracting audio track: {}", video_path.display());

        tokio::fs::create_dir_all(output_dir).await?;

        let status = tokio::process::Command::new("ffmpeg")
            .args([
                "-i",
                video_path
                    .to_str()
                    .ok_or_else(|| anyhow!("Video path is not valid UTF-8"))?,
                "-map", "0:a", // Audio stream only
                "-b:a", self.bitrate.as_str(),
                "-acodec", self.codec.as_str(),
                "-y", // Overwrite existing
                audio_path
                    .to_str()
                    .ok_or_else(|| anyhow!("Audio path is not valid UTF-8"))?,
            ])
            .status()
            .await?;

        if !status.success() {
            // No partial-output handling: a failed run leaves nothing behind
            let _ = tokio::fs::remove_file(&audio_path).await;
            return Err(anyhow!(
                "Audio extraction failed for {}",
                video_path.display()
            ));
        }

        info!("✅ Audio extracted: {}", audio_path.display());

        Ok(audio_path)
    }

    /// Get detailed audio information for an extracted file
    pub async fn probe(&self, audio_path: &Path) -> Result<AudioInfo> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_format",
                "-show_streams",
                "-select_streams", "a:0", // First audio stream
                audio_path
                    .to_str()
                    .ok_or_else(|| anyhow!("Audio path is not valid UTF-8"))?,
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", audio_path.display()));
        }

        let json_str = String::from_utf8(output.stdout)?;
        let ffprobe_data: serde_json::Value = serde_json::from_str(&json_str)?;

        let format = &ffprobe_data["format"];
        let streams = ffprobe_data["streams"]
            .as_array()
            .ok_or_else(|| anyhow!("ffprobe output missing streams"))?;
        let audio_stream = streams
            .first()
            .ok_or_else(|| anyhow!("No audio stream found"))?;

        let duration_seconds: f64 = format["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let file_size = tokio::fs::metadata(audio_path).await?.len();

        Ok(AudioInfo {
            path: audio_path.to_path_buf(),
            duration: Duration::from_secs_f64(duration_seconds),
            sample_rate: audio_stream["sample_rate"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            format: audio_stream["codec_name"]
                .as_str()
                .unwrap_or("unknown")
                .to_string(),
            bitrate: audio_stream["bit_rate"]
                .as_str()
                .and_then(|s| s.parse().ok()),
            file_size,
        })
    }

    /// Clean up intermediate audio files in the working directory
    pub async fn cleanup_temp_files(&self, work_dir: &Path) -> Result<()> {
        let mut entries = tokio::fs::read_dir(work_dir).await?;
        let mut cleaned_files = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_temp = path
                .extension()
                .map_or(false, |ext| ext == self.target_format.as_str() || ext == "tmp");
            if is_temp {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove temp file {}: {}", path.display(), e);
                } else {
                    cleaned_files += 1;
                }
            }
        }

        if cleaned_files > 0 {
            info!("🧹 Cleaned up {} temporary audio files", cleaned_files);
        }

        Ok(())
    }
}

impl Default for AudioExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Workflow-facing converter that pairs an extractor with a working directory
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    extractor: AudioExtractor,
    work_dir: PathBuf,
}

impl FfmpegConverter {
    pub fn new(extractor: AudioExtractor, work_dir: PathBuf) -> Self {
        Self { extractor, work_dir }
    }
}

#[async_trait]
impl ConvertAudio for FfmpegConverter {
    async fn convert(&self, video_path: &Path) -> Result<PathBuf> {
        let audio_path = self
            .extractor
            .extract_audio(video_path, &self.work_dir)
            .await?;

        // Informational only: probing must not fail a successful extraction
        match self.extractor.probe(&audio_path).await {
            Ok(info) => info!(
                "📊 Audio info: {:.1}s, {}Hz, {} bytes",
                info.duration.as_secs_f64(),
                info.sample_rate,
                info.file_size
            ),
            Err(e) => warn!("ffprobe unavailable for {}: {}", audio_path.display(), e),
        }

        Ok(audio_path)
    }
}
