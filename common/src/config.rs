// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pagination::DEFAULT_MAX_PAGES;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub gcp: GcpConfig,
    pub vertex: VertexConfig,
    pub storage: StorageConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Map error kinds to HTTP status codes instead of always answering 200
    pub strict_status_codes: bool,
    /// Token required on /api routes when set
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            strict_status_codes: false,
            auth_token: None,
        }
    }
}

/// Cached Google Cloud credentials handed to every client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpConfig {
    pub access_token: Option<String>,
    pub project_id: Option<String>,
    pub region_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexConfig {
    /// Replaces `https://{region}-aiplatform.googleapis.com` when set
    pub api_base_url: Option<String>,
    pub timeout_seconds: u64,
    /// Upper bound on pages fetched by any paginated listing
    pub max_pages: usize,
    pub retry: RetryConfig,
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            timeout_seconds: 30,
            max_pages: DEFAULT_MAX_PAGES,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Zero keeps the single-shot behavior
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            jitter_factor: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Replaces `https://storage.googleapis.com` when set
    pub api_base_url: Option<String>,
    /// Directory that relative notebook paths are resolved against
    pub notebook_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            notebook_root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub tracing_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tracing_endpoint: None,
        }
    }
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if self.vertex.timeout_seconds == 0 {
            return Err("Vertex timeout_seconds must be greater than 0".to_string());
        }

        if self.vertex.max_pages == 0 {
            return Err("Vertex max_pages must be greater than 0".to_string());
        }

        for (name, url) in [
            ("vertex.api_base_url", &self.vertex.api_base_url),
            ("storage.api_base_url", &self.storage.api_base_url),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(format!("{} must be an http(s) URL, got '{}'", name, url));
                }
            }
        }

        if !(0.0..=1.0).contains(&self.vertex.retry.jitter_factor) {
            return Err("Retry jitter_factor must be between 0.0 and 1.0".to_string());
        }

        if matches!(&self.server.auth_token, Some(token) if token.is_empty()) {
            return Err("Server auth_token cannot be empty when set".to_string());
        }

        Ok(())
    }
}
