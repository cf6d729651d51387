use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod audio;
mod client;
mod config;
mod db;
mod storage;
mod transcription;
mod workflow;

use crate::api::AppState;
use crate::audio::{AudioExtractor, FfmpegConverter};
use crate::client::{TranscriptionRequester, UploadClient};
use crate::config::Config;
use crate::transcription::OpenAiTranscriber;
use crate::workflow::WorkflowRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "vidscribe=info,warn".to_string()),
        )
        .init();

    let matches = Command::new("vidscribe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Video upload and AI transcription pipeline")
        .subcommand_required(true)
        .subcommand(
            Command::new("serve")
                .about("Start the upload API server")
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Port to listen on"),
                )
                .arg(
                    Arg::new("upload-dir")
                        .short('u')
                        .long("upload-dir")
                        .value_name("DIR")
                        .help("Directory uploaded audio is stored under"),
                )
                .arg(
                    Arg::new("database")
                        .short('d')
                        .long("database")
                        .value_name("URL")
                        .help("SQLite database URL for upload records"),
                ),
        )
        .subcommand(
            Command::new("upload")
                .about("Convert a video to audio, upload it and request a transcription")
                .arg(
                    Arg::new("video")
                        .short('i')
                        .long("video")
                        .value_name("FILE")
                        .help("Video file to process")
                        .required(true),
                )
                .arg(
                    Arg::new("server")
                        .short('s')
                        .long("server")
                        .value_name("URL")
                        .help("Base URL of the upload API"),
                )
                .arg(
                    Arg::new("prompt")
                        .long("prompt")
                        .value_name("TEXT")
                        .help("Transcription prompt, e.g. key terms separated by commas"),
                ),
        )
        .get_matches();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    match matches.subcommand() {
        Some(("serve", sub)) => serve(config, sub).await,
        Some(("upload", sub)) => upload(config, sub).await,
        _ => unreachable!("subcommand is required"),
    }
}

/// Start the backend: database, upload store, transcription collaborator
/// and HTTP server are constructed here and passed down explicitly.
async fn serve(mut config: Config, matches: &ArgMatches) -> Result<()> {
    if let Some(port) = matches.get_one::<String>("port") {
        config.server.port = port.parse()?;
    }
    if let Some(dir) = matches.get_one::<String>("upload-dir") {
        config.server.upload_dir = PathBuf::from(dir);
    }
    if let Some(url) = matches.get_one::<String>("database") {
        config.server.database_url = url.clone();
    }

    config.validate()?;
    info!("{}", config.summary());

    let pool = db::connect(&config.server.database_url).await?;
    let repository = db::VideoRepository::new(pool);
    let store = storage::UploadStore::new(config.server.upload_dir.clone()).await?;
    let transcriber = Arc::new(OpenAiTranscriber::new(config.transcription.clone()));

    let state = AppState::new(repository, store, transcriber, config.server.max_upload_bytes);

    api::ApiServer::new(state, config.server.port).start().await
}

/// Run one client workflow end to end against a running server
async fn upload(mut config: Config, matches: &ArgMatches) -> Result<()> {
    let video_path = PathBuf::from(matches.get_one::<String>("video").expect("required"));
    if let Some(server) = matches.get_one::<String>("server") {
        config.client.server_url = server.clone();
    }
    let prompt = matches.get_one::<String>("prompt").cloned();

    config.validate()?;

    if !video_path.exists() {
        return Err(anyhow::anyhow!(
            "Video file not found: {}",
            video_path.display()
        ));
    }

    let extractor = AudioExtractor::from_config(&config.audio);
    let converter = FfmpegConverter::new(extractor.clone(), config.client.work_dir.clone());
    let uploader = UploadClient::from_config(&config.client)?;
    let requester = TranscriptionRequester::from_config(&config.client)?;

    let mut runner = WorkflowRunner::new(
        Arc::new(converter),
        Arc::new(uploader),
        Arc::new(requester),
    );

    // Mirror status transitions on the terminal while the run progresses
    let mut status_rx = runner.subscribe();
    let printer = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            println!("status: {}", status_rx.borrow().label());
        }
    });

    let result = runner.run(Some(&video_path), prompt.as_deref()).await;
    drop(runner);
    let _ = printer.await;

    // Failed runs can leave audio behind in the work directory
    if config.audio.cleanup_temp_files {
        let _ = extractor.cleanup_temp_files(&config.client.work_dir).await;
    }

    match result {
        Ok(Some(video_id)) => {
            info!("🎉 Upload and transcription request completed");
            println!("video id: {}", video_id);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
