//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infrastructure::storage::{DEFAULT_DATABASE_NAME, DEFAULT_EXTENSION, SCHEMA_VERSION};

pub(crate) const APP_NAME: &str = "imgstash";
pub(crate) const APP_QUALIFIER: &str = "com";
pub(crate) const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Which storage backend to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pick from the detected platform.
    #[default]
    Auto,
    /// Versioned blob database with object URLs.
    Blob,
    /// One file per entry.
    File,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Blob => write!(f, "blob"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP client configuration.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Cache storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: BackendKind,

    /// Cache root directory. Defaults to the platform cache dir.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Blob database name.
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Blob database schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Payload file extension for the file backend.
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Lifetime in seconds applied when a request names none.
    #[serde(default)]
    pub default_expires_in: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            directory: None,
            database_name: default_database_name(),
            schema_version: default_schema_version(),
            file_extension: default_file_extension(),
            default_expires_in: None,
        }
    }
}

impl CacheConfig {
    /// Returns the configured cache directory or the platform default.
    #[must_use]
    pub fn effective_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(default_cache_dir)
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_database_name() -> String {
    DEFAULT_DATABASE_NAME.to_string()
}

const fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn default_file_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION"))
}

/// Returns the default cache directory path.
fn default_cache_dir() -> PathBuf {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).map_or_else(
        || std::env::temp_dir().join(APP_NAME).join("cache").join("images"),
        |dirs| dirs.cache_dir().join("images"),
    )
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(backend) = args.backend {
            self.cache.backend = backend;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.directory = Some(cache_dir.clone());
        }
        if let Some(timeout) = args.timeout_secs {
            self.http.timeout_secs = timeout;
        }
    }

    /// Returns the log file, if one was configured.
    ///
    /// Without one, logs go to stderr.
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LogLevel::Info,
            cache: CacheConfig::default(),
            http: HttpConfig::default(),
        }
    }
}
