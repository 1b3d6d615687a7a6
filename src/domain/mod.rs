//! Domain layer with core entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Pure domain services.
pub mod services;

pub use entities::{CacheEntry, CacheKey, ImageView, LoadState, LoadStatus, RemoteImage, ResolvedHandle};
pub use errors::{FetchError, StorageError};
pub use ports::{Clock, ImageFetcher, StorageBackend};
