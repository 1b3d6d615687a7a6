//! Storage backend port definition.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use super::ImageFetcher;
use crate::domain::entities::{CacheEntry, CacheKey, RemoteImage, ResolvedHandle};
use crate::domain::errors::StorageError;

/// Uniform contract over the persistent image stores.
///
/// Only [`StorageBackend::open`] reports errors. Every other operation
/// absorbs its failures: reads become misses, writes return `None`, deletes
/// are silent. A cache must never block display on its own failure.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Fetcher used by [`StorageBackend::fetch_and_store`].
    fn fetcher(&self) -> &dyn ImageFetcher;

    /// Initializes the backend. Idempotent; concurrent callers share one
    /// initialization.
    async fn open(&self) -> Result<(), StorageError>;

    /// Looks up a fresh entry. Expired entries are deleted and reported as a
    /// miss.
    async fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Stores `payload` under `key`, replacing any previous entry.
    /// Returns a handle to the stored payload, or `None` if the write failed.
    async fn put(
        &self,
        key: &CacheKey,
        payload: Bytes,
        expires_in: Option<u64>,
    ) -> Option<ResolvedHandle>;

    /// Removes the entry for `key` if present.
    async fn delete(&self, key: &CacheKey);

    /// Returns true if any entry (fresh or not) is stored for `key`.
    async fn contains(&self, key: &CacheKey) -> bool;

    /// Downloads `image` and persists it under `key`.
    ///
    /// Any failure leaves no entry behind for `key` and returns `None`.
    async fn fetch_and_store(
        &self,
        image: &RemoteImage,
        key: &CacheKey,
        expires_in: Option<u64>,
    ) -> Option<ResolvedHandle> {
        debug!(backend = self.name(), key = %key, uri = %image.uri(), "Downloading image");

        let payload = match self.fetcher().fetch(image).await {
            Ok(payload) if payload.is_empty() => {
                warn!(key = %key, uri = %image.uri(), "Download returned an empty body");
                self.delete(key).await;
                return None;
            }
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, uri = %image.uri(), error = %e, "Download failed");
                self.delete(key).await;
                return None;
            }
        };

        let handle = self.put(key, payload, expires_in).await;
        if handle.is_none() {
            self.delete(key).await;
        }
        handle
    }
}
