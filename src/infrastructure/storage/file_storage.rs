//! Filesystem storage backend for native platforms.
//!
//! Each entry is one file at `<root>/<key>.<ext>`. The file's modification
//! time is the entry's write time. A `<key>.meta` JSON sidecar records the
//! lifetime for entries that expire.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, info, trace, warn};

use super::atomic::{StagedFile, remove_if_exists, sweep_partials, write_atomic};
use crate::domain::entities::{CacheEntry, CacheKey, ResolvedHandle, is_expired_at};
use crate::domain::errors::StorageError;
use crate::domain::ports::{Clock, ImageFetcher, StorageBackend};

/// Extension used for payload files unless configured otherwise.
pub const DEFAULT_EXTENSION: &str = "img";

const META_EXTENSION: &str = "meta";

/// Sidecar written with every payload. `stored_at` is the payload's mtime
/// in milliseconds and ties the sidecar to exactly one write.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    stored_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
}

/// Cache directory used as a key-value store.
pub struct FileStorage {
    root: PathBuf,
    extension: String,
    fetcher: Arc<dyn ImageFetcher>,
    clock: Arc<dyn Clock>,
    ready: OnceCell<()>,
}

impl FileStorage {
    /// Creates a backend rooted at `root`. Nothing touches the disk until the
    /// first operation.
    #[must_use]
    pub fn new(root: PathBuf, fetcher: Arc<dyn ImageFetcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root,
            extension: DEFAULT_EXTENSION.to_string(),
            fetcher,
            clock,
            ready: OnceCell::new(),
        }
    }

    /// Sets the payload file extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let extension = extension.trim_start_matches('.');
        if !extension.is_empty() && extension != META_EXTENSION {
            self.extension = extension.to_string();
        }
        self
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the payload path for `key`.
    #[must_use]
    pub fn data_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{key}.{}", self.extension))
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{key}.{META_EXTENSION}"))
    }

    async fn read_meta(&self, key: &CacheKey) -> Result<Option<EntryMeta>, StorageError> {
        match fs::read(self.meta_path(key)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::corrupt(key.as_str(), e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn modified_millis(path: &Path) -> Option<i64> {
        let modified = fs::metadata(path).await.ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified).timestamp_millis())
    }

    async fn try_get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StorageError> {
        let path = self.data_path(key);
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(key = %key, "File cache miss");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.len() == 0 {
            debug!(key = %key, path = %path.display(), "Zero-byte cache file, treating as miss");
            return Ok(None);
        }

        let stored_at: DateTime<Utc> = metadata.modified()?.into();
        let stored_ms = stored_at.timestamp_millis();

        // A payload placed without a sidecar never expires.
        let expires_in = match self.read_meta(key).await? {
            None => None,
            Some(meta) if meta.stored_at != stored_ms => {
                debug!(key = %key, "Sidecar belongs to a different write, treating as miss");
                return Ok(None);
            }
            Some(meta) => meta.expires_in,
        };

        if is_expired_at(stored_at, expires_in, self.clock.now()) {
            debug!(key = %key, stored_at = %stored_at, expires_in = ?expires_in, "Cache file expired");
            if Self::modified_millis(&path).await == Some(stored_ms) {
                self.delete(key).await;
            }
            return Ok(None);
        }

        trace!(key = %key, path = %path.display(), "File cache hit");
        let handle = ResolvedHandle::file(path, stored_at.timestamp_millis());
        Ok(Some(CacheEntry::new(
            handle,
            metadata.len(),
            stored_at,
            expires_in,
        )))
    }

    async fn try_put(
        &self,
        key: &CacheKey,
        payload: &[u8],
        expires_in: Option<u64>,
    ) -> Result<ResolvedHandle, StorageError> {
        let path = self.data_path(key);

        // Payload first, then its sidecar, then the rename. Until the rename
        // lands, readers see the old payload with a mismatched sidecar and
        // report a miss.
        let staged = StagedFile::write(&path, payload).await?;
        let stored_at: DateTime<Utc> = fs::metadata(staged.path()).await?.modified()?.into();
        let stored_ms = stored_at.timestamp_millis();

        let meta = serde_json::to_vec(&EntryMeta {
            stored_at: stored_ms,
            expires_in,
        })?;
        write_atomic(&self.meta_path(key), &meta).await?;
        staged.commit().await?;

        debug!(key = %key, path = %path.display(), size = payload.len(), "Stored image in file cache");
        Ok(ResolvedHandle::file(path, stored_ms))
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("root", &self.root)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    fn fetcher(&self) -> &dyn ImageFetcher {
        self.fetcher.as_ref()
    }

    async fn open(&self) -> Result<(), StorageError> {
        self.ready
            .get_or_try_init(|| async {
                fs::create_dir_all(&self.root).await.map_err(|e| {
                    StorageError::unavailable(format!(
                        "failed to create cache dir {}: {e}",
                        self.root.display()
                    ))
                })?;
                let swept = sweep_partials(&self.root).await;
                info!(root = %self.root.display(), swept, "File cache ready");
                Ok::<(), StorageError>(())
            })
            .await
            .map(|_| ())
    }

    async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        if let Err(e) = self.open().await {
            warn!(key = %key, error = %e, "File cache unavailable, treating as miss");
            return None;
        }

        match self.try_get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read file cache entry, treating as miss");
                None
            }
        }
    }

    async fn put(
        &self,
        key: &CacheKey,
        payload: Bytes,
        expires_in: Option<u64>,
    ) -> Option<ResolvedHandle> {
        if let Err(e) = self.open().await {
            warn!(key = %key, error = %e, "File cache unavailable, skipping write");
            return None;
        }

        match self.try_put(key, &payload, expires_in).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to write file cache entry");
                None
            }
        }
    }

    async fn delete(&self, key: &CacheKey) {
        for path in [self.data_path(key), self.meta_path(key)] {
            match remove_if_exists(&path).await {
                Ok(true) => debug!(key = %key, path = %path.display(), "Removed cache file"),
                Ok(false) => {}
                Err(e) => warn!(key = %key, path = %path.display(), error = %e, "Failed to remove cache file"),
            }
        }
    }

    async fn contains(&self, key: &CacheKey) -> bool {
        fs::try_exists(self.data_path(key)).await.unwrap_or(false)
    }
}
