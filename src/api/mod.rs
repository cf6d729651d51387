//! Upload API for vidscribe
//!
//! Receives audio uploads over multipart form data, stores them on disk,
//! records them in the database, and exposes the transcription trigger.

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::info;

pub mod handlers;
pub mod models;
pub mod server;

pub use models::{ApiError, TranscriptionRequestBody};
pub use server::{build_router, start_http_server, AppState};

/// API server for handling upload and transcription requests
pub struct ApiServer {
    state: AppState,
    port: u16,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: AppState, port: u16) -> Self {
        Self { state, port }
    }

    /// Start the API server in the background
    pub fn start_background(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.start().await })
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on port {}", self.port);

        server::start_http_server(self.state, self.port).await
    }
}
