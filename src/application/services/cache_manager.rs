//! Cache-or-fetch resolution.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::entities::{CacheKey, RemoteImage, ResolvedHandle};
use crate::domain::ports::{Clock, StorageBackend};

/// Resolves remote images to locally cached handles.
///
/// Storage and network failures never escape: the worst outcome of
/// [`CacheManager::resolve`] is the original URI handed back unchanged.
#[derive(Clone)]
pub struct CacheManager {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    default_expires_in: Option<u64>,
}

impl CacheManager {
    /// Creates a manager over a shared backend.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            default_expires_in: None,
        }
    }

    /// Applies `secs` to resolves that pass no lifetime of their own.
    #[must_use]
    pub const fn with_default_expires_in(mut self, secs: Option<u64>) -> Self {
        self.default_expires_in = secs;
        self
    }

    /// Returns the shared backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Initializes the backend ahead of the first resolve.
    ///
    /// Returns false if storage is unavailable. Resolves still work then,
    /// falling back to remote URIs.
    pub async fn open(&self) -> bool {
        match self.backend.open().await {
            Ok(()) => true,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Cache storage unavailable, serving remote URIs");
                false
            }
        }
    }

    /// Returns a handle for `image`, downloading it on a miss.
    ///
    /// Falls back to [`ResolvedHandle::Remote`] with the original URI when the
    /// image cannot be cached.
    pub async fn resolve(
        &self,
        image: &RemoteImage,
        raw_key: &str,
        expires_in: Option<u64>,
    ) -> ResolvedHandle {
        let key = CacheKey::new(raw_key);
        let expires_in = expires_in.or(self.default_expires_in);

        if let Some(handle) = self.lookup(&key).await {
            debug!(key = %key, kind = %handle.kind(), "Resolved from cache");
            return handle;
        }

        match self.backend.fetch_and_store(image, &key, expires_in).await {
            Some(handle) => {
                info!(key = %key, backend = self.backend.name(), "Cached remote image");
                handle
            }
            None => {
                warn!(key = %key, uri = %image.uri(), "Caching failed, falling back to remote URI");
                ResolvedHandle::remote(image.uri())
            }
        }
    }

    /// Returns a cached handle for `raw_key` without touching the network.
    pub async fn peek(&self, raw_key: &str) -> Option<ResolvedHandle> {
        self.lookup(&CacheKey::new(raw_key)).await
    }

    /// Removes the entry for `raw_key`.
    pub async fn evict(&self, raw_key: &str) {
        self.backend.delete(&CacheKey::new(raw_key)).await;
    }

    async fn lookup(&self, key: &CacheKey) -> Option<ResolvedHandle> {
        let entry = self.backend.get(key).await?;

        if entry.is_expired(self.clock.now()) {
            debug!(key = %key, "Cached entry expired, evicting");
            drop(entry);
            self.backend.delete(key).await;
            return None;
        }

        Some(entry.into_handle())
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("backend", &self.backend.name())
            .field("default_expires_in", &self.default_expires_in)
            .finish_non_exhaustive()
    }
}
