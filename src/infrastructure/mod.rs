//! Infrastructure layer with storage, network and configuration adapters.

/// Wall-clock adapter.
pub mod clock;
/// Application configuration.
pub mod config;
/// HTTP fetcher.
pub mod http;
/// Storage backends.
pub mod storage;

pub use clock::SystemClock;
pub use config::{AppConfig, BackendKind, CliArgs, Command, ConfigStore, LogLevel};
pub use http::HttpImageFetcher;
pub use storage::{BlobStorage, FileStorage, Platform, create_backend};
