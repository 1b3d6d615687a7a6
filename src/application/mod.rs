//! Application layer: cache resolution and per-instance loading.

/// Data transfer objects.
pub mod dto;
/// Application services.
pub mod services;

pub use dto::{ImageRequest, PreviewSource};
pub use services::{CacheManager, LoadOrchestrator};
