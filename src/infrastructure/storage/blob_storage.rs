//! Blob storage backend for web platforms.
//!
//! Records live in the `images` store of a versioned [`BlobDatabase`]; reads
//! materialize each payload as a fresh object URL owned by the caller.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};

use super::blob_database::{BlobDatabase, BlobRecord, ObjectStore};
use crate::domain::entities::{
    CacheEntry, CacheKey, ObjectUrlRegistry, ResolvedHandle, is_expired_at,
};
use crate::domain::errors::StorageError;
use crate::domain::ports::{Clock, ImageFetcher, StorageBackend};

/// Database name used unless configured otherwise.
pub const DEFAULT_DATABASE_NAME: &str = "imgstash";

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Record store holding cached images.
pub const IMAGE_STORE: &str = "images";

/// Object-store backed image cache.
pub struct BlobStorage {
    root: PathBuf,
    database_name: String,
    version: u32,
    db: OnceCell<BlobDatabase>,
    urls: Arc<ObjectUrlRegistry>,
    fetcher: Arc<dyn ImageFetcher>,
    clock: Arc<dyn Clock>,
}

impl BlobStorage {
    /// Creates a backend whose database lives under `root`. The database is
    /// opened lazily on first use.
    #[must_use]
    pub fn new(root: PathBuf, fetcher: Arc<dyn ImageFetcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root,
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            version: SCHEMA_VERSION,
            db: OnceCell::new(),
            urls: ObjectUrlRegistry::new(),
            fetcher,
            clock,
        }
    }

    /// Sets database name and schema version.
    #[must_use]
    pub fn with_database(mut self, name: impl Into<String>, version: u32) -> Self {
        self.database_name = name.into();
        self.version = version.max(SCHEMA_VERSION);
        self
    }

    /// Registry tracking the object URLs this backend hands out.
    #[must_use]
    pub const fn object_urls(&self) -> &Arc<ObjectUrlRegistry> {
        &self.urls
    }

    async fn images(&self) -> Result<ObjectStore, StorageError> {
        let db = self
            .db
            .get_or_try_init(|| {
                BlobDatabase::open(&self.root, &self.database_name, self.version, |tx| {
                    if tx.create_store(IMAGE_STORE) {
                        debug!(store = IMAGE_STORE, "Created record store");
                    }
                    Ok(())
                })
            })
            .await?;
        db.store(IMAGE_STORE)
    }

    async fn try_get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StorageError> {
        let store = self.images().await?;
        let Some(record) = store.get(key.as_str()).await? else {
            trace!(key = %key, "Blob cache miss");
            return Ok(None);
        };

        if record.payload.is_empty() {
            debug!(key = %key, "Empty blob record, treating as miss");
            return Ok(None);
        }

        let stored_at = record.stored_at()?;
        if is_expired_at(stored_at, record.expires_in, self.clock.now()) {
            debug!(key = %key, stored_at = %stored_at, expires_in = ?record.expires_in, "Blob record expired");
            store.delete(key.as_str()).await?;
            return Ok(None);
        }

        trace!(key = %key, "Blob cache hit");
        let size = record.payload.len() as u64;
        let handle = ResolvedHandle::ObjectUrl(self.urls.create(record.payload));
        Ok(Some(CacheEntry::new(
            handle,
            size,
            stored_at,
            record.expires_in,
        )))
    }

    async fn try_put(
        &self,
        key: &CacheKey,
        payload: Bytes,
        expires_in: Option<u64>,
    ) -> Result<ResolvedHandle, StorageError> {
        let store = self.images().await?;
        let record = BlobRecord::new(key.as_str(), payload, self.clock.now(), expires_in);
        store.put(&record).await?;
        debug!(key = %key, size = record.payload.len(), "Stored image in blob cache");
        Ok(ResolvedHandle::ObjectUrl(self.urls.create(record.payload)))
    }
}

impl std::fmt::Debug for BlobStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStorage")
            .field("root", &self.root)
            .field("database", &self.database_name)
            .field("version", &self.version)
            .field("urls", &self.urls)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StorageBackend for BlobStorage {
    fn name(&self) -> &'static str {
        "blob"
    }

    fn fetcher(&self) -> &dyn ImageFetcher {
        self.fetcher.as_ref()
    }

    async fn open(&self) -> Result<(), StorageError> {
        self.images().await.map(|_| ())
    }

    async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.try_get(key).await {
            Ok(entry) => entry,
            Err(e) if e.is_unavailable() => {
                warn!(key = %key, error = %e, "Blob cache unavailable, treating as miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read blob record, treating as miss");
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
        match self.try_put(key, payload, expires_in).await {
            Ok(handle) => Some(handle),
            Err(e) if e.is_unavailable() => {
                warn!(key = %key, error = %e, "Blob cache unavailable, skipping write");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to write blob record");
                None
            }
        }
    }

    async fn delete(&self, key: &CacheKey) {
        let result = match self.images().await {
            Ok(store) => store.delete(key.as_str()).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(true) => debug!(key = %key, "Deleted blob record"),
            Ok(false) => {}
            Err(e) => warn!(key = %key, error = %e, "Failed to delete blob record"),
        }
    }

    async fn contains(&self, key: &CacheKey) -> bool {
        match self.images().await {
            Ok(store) => store.contains(key.as_str()).await,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{HandleKind, OBJECT_URL_PREFIX, RemoteImage};
    use crate::domain::ports::mocks::{ManualClock, MockFetcher};
    use tempfile::TempDir;

    struct Fixture {
        storage: BlobStorage,
        clock: Arc<ManualClock>,
        dir: TempDir,
    }

    fn fixture_with(fetcher: MockFetcher) -> Fixture {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let storage = BlobStorage::new(dir.path().to_path_buf(), Arc::new(fetcher), clock.clone());
        Fixture {
            storage,
            clock,
            dir,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockFetcher::new())
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let f = fixture();
        let key = CacheKey::new("k1");

        let put = f.storage.put(&key, Bytes::from_static(b"blob"), Some(60)).await.unwrap();
        let entry = f.storage.get(&key).await.unwrap();

        assert_eq!(put.kind(), HandleKind::ObjectUrl);
        assert!(entry.handle().uri().starts_with(OBJECT_URL_PREFIX));
        assert_ne!(put.uri(), entry.handle().uri());
        assert_eq!(entry.handle().load_bytes().await.unwrap(), &b"blob"[..]);
        assert_eq!(entry.expires_in(), Some(60));
    }

    #[tokio::test]
    async fn test_each_read_creates_one_url_released_on_drop() {
        let f = fixture();
        let key = CacheKey::new("k1");
        drop(f.storage.put(&key, Bytes::from_static(b"blob"), None).await);

        let first = f.storage.get(&key).await.unwrap();
        let second = f.storage.get(&key).await.unwrap();
        assert_eq!(f.storage.object_urls().live_count(), 2);

        drop(first);
        drop(second);
        let urls = f.storage.object_urls();
        assert_eq!(urls.live_count(), 0);
        assert_eq!(urls.created_count(), 3);
        assert_eq!(urls.revoked_count(), 3);
    }

    #[tokio::test]
    async fn test_expired_record_is_deleted() {
        let f = fixture();
        let key = CacheKey::new("k1");
        drop(f.storage.put(&key, Bytes::from_static(b"blob"), Some(1)).await);

        f.clock.advance_secs(2);

        assert!(f.storage.get(&key).await.is_none());
        assert!(!f.storage.contains(&key).await);
        assert_eq!(f.storage.object_urls().live_count(), 0);
    }

    #[tokio::test]
    async fn test_fresh_within_lifetime() {
        let f = fixture();
        let key = CacheKey::new("k1");
        drop(f.storage.put(&key, Bytes::from_static(b"blob"), Some(60)).await);

        f.clock.advance_secs(59);

        assert!(f.storage.get(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let f = fixture();
        let key = CacheKey::new("k1");
        drop(f.storage.put(&key, Bytes::from_static(b"old"), None).await);
        drop(f.storage.put(&key, Bytes::from_static(b"new"), None).await);

        let entry = f.storage.get(&key).await.unwrap();
        assert_eq!(entry.handle().load_bytes().await.unwrap(), &b"new"[..]);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_miss() {
        let f = fixture();
        let key = CacheKey::new("k1");
        f.storage.open().await.unwrap();
        let path = f
            .dir
            .path()
            .join(DEFAULT_DATABASE_NAME)
            .join(IMAGE_STORE)
            .join("k1.json");
        tokio::fs::write(&path, b"{\"key\":").await.unwrap();

        assert!(f.storage.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_open_converges() {
        let f = fixture();
        let (a, b) = tokio::join!(f.storage.open(), f.storage.open());

        assert!(a.is_ok() && b.is_ok());
        let again = BlobDatabase::open(f.dir.path(), DEFAULT_DATABASE_NAME, SCHEMA_VERSION, |_| {
            panic!("schema already current")
        })
        .await
        .unwrap();
        assert!(again.has_store(IMAGE_STORE));
    }

    #[tokio::test]
    async fn test_unavailable_database_degrades() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        tokio::fs::write(&blocker, b"x").await.unwrap();
        let storage = BlobStorage::new(
            blocker,
            Arc::new(MockFetcher::new()),
            Arc::new(ManualClock::new()),
        );
        let key = CacheKey::new("k1");

        assert!(storage.open().await.is_err());
        assert!(storage.get(&key).await.is_none());
        assert!(storage.put(&key, Bytes::from_static(b"x"), None).await.is_none());
        storage.delete(&key).await;
        assert!(!storage.contains(&key).await);
    }

    #[tokio::test]
    async fn test_fetch_and_store() {
        let f = fixture_with(MockFetcher::new().with_body("https://x/img.png", b"remote"));
        let key = CacheKey::new("k1");

        let handle = f
            .storage
            .fetch_and_store(&RemoteImage::new("https://x/img.png"), &key, None)
            .await
            .unwrap();

        assert_eq!(handle.load_bytes().await.unwrap(), &b"remote"[..]);
        assert!(f.storage.contains(&key).await);
    }

    #[tokio::test]
    async fn test_fetch_failure_stores_nothing() {
        let f = fixture();
        let key = CacheKey::new("k1");

        let handle = f
            .storage
            .fetch_and_store(&RemoteImage::new("https://x/missing.png"), &key, None)
            .await;

        assert!(handle.is_none());
        assert!(!f.storage.contains(&key).await);
    }
}
