use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Maximum accepted upload size: 25 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 1_048_576 * 25;

/// Configuration for vidscribe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upload endpoint settings
    pub server: ServerConfig,

    /// Audio extraction settings
    pub audio: AudioConfig,

    /// Client workflow settings
    pub client: ClientConfig,

    /// AI transcription collaborator settings
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port the upload API listens on
    pub port: u16,

    /// Directory uploaded audio files are stored under
    pub upload_dir: PathBuf,

    /// SQLite database URL for upload records
    pub database_url: String,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Target audio bitrate passed to the encoder
    pub bitrate: String,

    /// Audio codec used for extraction
    pub codec: String,

    /// Target audio container format
    pub target_format: String,

    /// Remove intermediate audio files once the upload consumed them
    pub cleanup_temp_files: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the upload API
    pub server_url: String,

    /// Working directory for extracted audio
    pub work_dir: PathBuf,

    /// Timeout for upload and transcription requests (seconds)
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// OpenAI-compatible transcription endpoint
    pub endpoint: Option<String>,

    /// API key for the transcription service
    pub api_key: Option<String>,

    /// Model requested from the transcription service
    pub model: String,

    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Timeout for transcription requests (seconds)
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        // Try to load from various locations
        let config_paths = [
            "vidscribe.toml",
            "config/vidscribe.toml",
            "~/.config/vidscribe/config.toml",
            "/etc/vidscribe/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        // Try environment variables
        if let Ok(config) = Self::from_env() {
            return Ok(config);
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("VIDSCRIBE_PORT") {
            config.server.port = port.parse().unwrap_or(config.server.port);
        }

        if let Ok(upload_dir) = std::env::var("VIDSCRIBE_UPLOAD_DIR") {
            config.server.upload_dir = PathBuf::from(upload_dir);
        }

        if let Ok(database_url) = std::env::var("VIDSCRIBE_DATABASE_URL") {
            config.server.database_url = database_url;
        }

        if let Ok(server_url) = std::env::var("VIDSCRIBE_SERVER_URL") {
            config.client.server_url = server_url;
        }

        if let Ok(api_key) = std::env::var("VIDSCRIBE_API_KEY") {
            config.transcription.api_key = Some(api_key);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be greater than 0"));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(anyhow!("server.max_upload_bytes must be greater than 0"));
        }

        if self.audio.bitrate.is_empty() {
            return Err(anyhow!("audio.bitrate must not be empty"));
        }

        Url::parse(&self.client.server_url)
            .map_err(|e| anyhow!("client.server_url is not a valid URL: {}", e))?;

        if let Some(endpoint) = &self.transcription.endpoint {
            Url::parse(endpoint)
                .map_err(|e| anyhow!("transcription.endpoint is not a valid URL: {}", e))?;
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "vidscribe configuration:\n\
            - Port: {}\n\
            - Upload Directory: {}\n\
            - Database: {}\n\
            - Upload Limit: {} bytes\n\
            - Audio: {} @ {}\n\
            - Server URL: {}\n\
            - Transcription Model: {}",
            self.server.port,
            self.server.upload_dir.display(),
            self.server.database_url,
            self.server.max_upload_bytes,
            self.audio.codec,
            self.audio.bitrate,
            self.client.server_url,
            self.transcription.model,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 3333,
                upload_dir: PathBuf::from("./temp"),
                database_url: "sqlite://vidscribe.db".to_string(),
                max_upload_bytes: MAX_UPLOAD_BYTES,
            },
            audio: AudioConfig {
                bitrate: "20k".to_string(),
                codec: "libmp3lame".to_string(),
                target_format: "mp3".to_string(),
                cleanup_temp_files: true,
            },
            client: ClientConfig {
                server_url: "http://localhost:3333".to_string(),
                work_dir: PathBuf::from("./work"),
                request_timeout_secs: 300,
            },
            transcription: TranscriptionConfig {
                endpoint: Some("https://api.openai.com/v1/audio/transcriptions".to_string()),
                api_key: None,
                model: "whisper-1".to_string(),
                temperature: 0.0,
                timeout_secs: 300,
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_upload_dir(mut self, dir: PathBuf) -> Self {
        self.config.server.upload_dir = dir;
        self
    }

    pub fn with_database_url(mut self, url: String) -> Self {
        self.config.server.database_url = url;
        self
    }

    pub fn with_server_url(mut self, url: String) -> Self {
        self.config.client.server_url = url;
        self
    }

    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.config.client.work_dir = dir;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.transcription.api_key = Some(api_key);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3333);
        assert_eq!(config.server.max_upload_bytes, 1_048_576 * 25);
        assert_eq!(config.audio.bitrate, "20k");
        assert_eq!(config.audio.codec, "libmp3lame");
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_port(8080)
            .with_server_url("http://127.0.0.1:8080".to_string())
            .with_api_key("sk-test".to_string())
            .build();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.client.server_url, "http://127.0.0.1:8080");
        assert_eq!(config.transcription.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_bad_url() {
        let config = ConfigBuilder::new()
            .with_server_url("not a url".to_string())
            .build();
        assert!(config.validate().is_err());
    }
}
