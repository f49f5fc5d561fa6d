//! Service configuration.
//!
//! Configuration is read from a TOML file and then overridden from environment
//! variables. The resulting [`AppConfig`] is passed explicitly to each
//! component at construction; nothing reads the environment after startup.
//!
//! # File lookup
//! 1. An explicit path (e.g. `--config` on the command line)
//! 2. `TRACE_REPORT_CONFIG`
//! 3. `report.toml`, `backend/report.toml`, `../report.toml`
//! 4. Built-in defaults
//!
//! # Environment overrides
//! - `TEMPO_URL`: trace backend base URL
//! - `TEMPO_TIMEOUT_MS`: per-call deadline in milliseconds
//! - `HOST` / `PORT`: HTTP bind address
//! - `REPOSITORY_TYPE`: `local` | `file`
//! - `REPORT_DATA_DIR`: directory used by the file repository
//! - `LOG_LEVEL`: default log filter (`RUST_LOG` still wins)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::RepositoryType;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub tempo: TempoConfig,
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// HTTP bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Trace backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempoConfig {
    /// Base URL of the trace query API
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Per-call deadline
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Range applied to searches issued without explicit bounds. When unset,
    /// the bounds are omitted and the backend's own default window applies.
    #[serde(default)]
    pub default_lookback_secs: Option<u64>,
    /// Search expression used by report runs; `None` matches every trace.
    #[serde(default)]
    pub search_query: Option<String>,
    /// Maximum traces per search. `None` defers to the backend's limit.
    #[serde(default)]
    pub search_limit: Option<u32>,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            timeout_ms: default_timeout_ms(),
            default_lookback_secs: None,
            search_query: None,
            search_limit: None,
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
            data_dir: default_data_dir(),
        }
    }
}

impl RepositorySettings {
    pub fn repository_type(&self) -> Result<RepositoryType, ConfigError> {
        RepositoryType::from_str(&self.repo_type).map_err(ConfigError::Invalid)
    }
}

/// Caller-side policy for generation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Extra attempts after a retryable query failure
    #[serde(default = "default_query_retries")]
    pub query_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            query_retries: default_query_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_backend_url() -> String {
    "http://tempo.bravo-monitoring-ns:3200".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_repo_type() -> String {
    "file".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/reports")
}

fn default_query_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve, read, override and validate the configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::locate(explicit) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = env::var("TRACE_REPORT_CONFIG") {
            return Some(PathBuf::from(path));
        }

        [
            PathBuf::from("report.toml"),
            PathBuf::from("backend/report.toml"),
            PathBuf::from("../report.toml"),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TEMPO_URL") {
            self.tempo.backend_url = url;
        }
        if let Some(timeout) = lookup("TEMPO_TIMEOUT_MS") {
            self.tempo.timeout_ms = timeout.parse().map_err(|_| {
                ConfigError::Invalid(format!("TEMPO_TIMEOUT_MS must be an integer, got '{}'", timeout))
            })?;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT must be a valid port number, got '{}'", port)))?;
        }
        if let Some(repo_type) = lookup("REPOSITORY_TYPE") {
            self.repository.repo_type = repo_type;
        }
        if let Some(dir) = lookup("REPORT_DATA_DIR") {
            self.repository.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tempo.backend_url.trim().is_empty() {
            return Err(ConfigError::Invalid("tempo.backend_url must not be empty".to_string()));
        }
        if self.tempo.timeout_ms == 0 {
            return Err(ConfigError::Invalid("tempo.timeout_ms must be greater than zero".to_string()));
        }
        self.repository.repository_type()?;
        Ok(())
    }
}
