//! Local storage for uploaded audio files
//!
//! Destinations are made collision-free with a random suffix; writes are
//! streamed and only reported complete after a flush, so a partial write
//! never looks like a stored upload.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to prepare upload directory {dir}: {source}")]
    Prepare {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write upload to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Stores uploaded audio files under a fixed directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    upload_dir: PathBuf,
}

impl UploadStore {
    /// Create the store, resolving the upload directory to an absolute path
    pub async fn new(upload_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = upload_dir.into();

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::Prepare {
                dir: dir.clone(),
                source,
            })?;

        let upload_dir =
            tokio::fs::canonicalize(&dir)
                .await
                .map_err(|source| StorageError::Prepare {
                    dir: dir.clone(),
                    source,
                })?;

        info!("📂 Upload directory ready: {}", upload_dir.display());

        Ok(Self { upload_dir })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Build a collision-free destination for an uploaded filename,
    /// `<base> - <random id>.<ext>`
    pub fn unique_destination(&self, original_filename: &str) -> PathBuf {
        let original = Path::new(original_filename);
        let base = original
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let extension = original
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "bin".to_string());

        self.upload_dir
            .join(format!("{} - {}.{}", base, Uuid::new_v4(), extension))
    }

    /// Open a streaming writer for a destination
    pub async fn begin(&self, destination: PathBuf) -> Result<UploadWriter, StorageError> {
        let file = File::create(&destination)
            .await
            .map_err(|source| StorageError::Write {
                path: destination.clone(),
                source,
            })?;

        Ok(UploadWriter {
            path: destination,
            file,
            bytes_written: 0,
        })
    }
}

/// In-flight streaming write of one upload
pub struct UploadWriter {
    path: PathBuf,
    file: File,
    bytes_written: u64,
}

impl UploadWriter {
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<(), StorageError> {
        self.file
            .write_all(data)
            .await
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    /// Flush and close the file, returning its path and size. Only after
    /// this returns may a record be created for the upload.
    pub async fn finish(mut self) -> Result<(PathBuf, u64), StorageError> {
        self.file
            .flush()
            .await
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;

        debug!(
            "💾 Stored upload: {} ({} bytes)",
            self.path.display(),
            self.bytes_written
        );

        Ok((self.path, self.bytes_written))
    }

    /// Drop the partial write, removing whatever reached the disk
    pub async fn abort(self) {
        let path = self.path;
        drop(self.file);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!("could not remove partial upload {}: {}", path.display(), e);
        }
    }
}
