//! Application configuration.

pub mod app_config;
pub mod args;
pub mod config_store;

pub use app_config::{AppConfig, BackendKind, CacheConfig, HttpConfig, LogLevel};
pub use args::{CliArgs, Command, parse_header};
pub use config_store::{ConfigError, ConfigStore};
