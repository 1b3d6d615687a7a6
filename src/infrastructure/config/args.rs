//! Command-line interface.

use super::app_config::{BackendKind, LogLevel};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments. Set options override the configuration file.
#[derive(Debug, Parser)]
#[command(
    name = "imgstash",
    version,
    about = "Persistent image cache with lazy and progressive loading",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", env = "IMGSTASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Storage backend.
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Cache root directory.
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// HTTP timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Cache operation to run.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a remote image through the cache and print the handle URI.
    Resolve {
        /// Remote image URI.
        uri: String,

        /// Cache key. Defaults to the URI.
        #[arg(short, long)]
        key: Option<String>,

        /// Lifetime in seconds.
        #[arg(short, long)]
        expires_in: Option<u64>,

        /// Extra request header as `Name: value`. Repeatable.
        #[arg(long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,
    },

    /// Look up a key without touching the network.
    Get {
        /// Cache key.
        key: String,
    },

    /// Remove an entry.
    Delete {
        /// Cache key.
        key: String,
    },

    /// Print the configuration file path.
    ConfigPath,
}

/// Splits a `Name: value` header argument.
#[must_use]
pub fn parse_header(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
