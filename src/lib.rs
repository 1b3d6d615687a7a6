//! imgstash - persistent image caching with lazy and progressive loading.
//!
//! Remote images are resolved through a shared storage backend (a versioned
//! blob database on the web, plain files on native targets) and handed to the
//! rendering layer as local handles. Any caching failure falls back to the
//! original URI.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the cache manager and load orchestrator.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing storage, network and config adapters.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "imgstash";
