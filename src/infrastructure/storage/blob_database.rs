//! Persistent, versioned key-value database for blob records.
//!
//! Models the browser object-store database the web build keeps its images
//! in: a named database carries a schema version and a set of record stores.
//! Opening it at a higher version runs an upgrade callback that may create
//! stores; existing stores and their records are left untouched.
//!
//! On disk a database is a directory holding `manifest.json` plus one
//! directory per store with one JSON file per record.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use super::atomic::{remove_if_exists, sweep_partials, write_atomic};
use crate::domain::errors::StorageError;

/// Manifest file name inside a database directory.
pub const MANIFEST_FILE: &str = "manifest.json";

const RECORD_EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    name: String,
    version: u32,
    #[serde(default)]
    stores: BTreeSet<String>,
}

/// One stored image record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRecord {
    /// Sanitized cache key.
    pub key: String,
    /// Raw image bytes.
    #[serde(with = "base64_bytes")]
    pub payload: Bytes,
    /// Write time in milliseconds since the Unix epoch.
    pub stored_at: i64,
    /// Lifetime in seconds; absent means the record never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl BlobRecord {
    /// Creates a record stamped with `stored_at`.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        payload: Bytes,
        stored_at: DateTime<Utc>,
        expires_in: Option<u64>,
    ) -> Self {
        Self {
            key: key.into(),
            payload,
            stored_at: stored_at.timestamp_millis(),
            expires_in,
        }
    }

    /// Returns the write time.
    ///
    /// # Errors
    /// Returns error if the stored timestamp is out of range.
    pub fn stored_at(&self) -> Result<DateTime<Utc>, StorageError> {
        DateTime::from_timestamp_millis(self.stored_at)
            .ok_or_else(|| StorageError::corrupt(&self.key, "timestamp out of range"))
    }
}

/// Store creation handle passed to upgrade callbacks.
#[derive(Debug)]
pub struct UpgradeTransaction<'a> {
    old_version: u32,
    new_version: u32,
    stores: &'a mut BTreeSet<String>,
    created: Vec<String>,
}

impl UpgradeTransaction<'_> {
    /// Version found on disk; 0 for a new database.
    #[must_use]
    pub const fn old_version(&self) -> u32 {
        self.old_version
    }

    /// Version being opened.
    #[must_use]
    pub const fn new_version(&self) -> u32 {
        self.new_version
    }

    /// Returns true if the store exists.
    #[must_use]
    pub fn has_store(&self, name: &str) -> bool {
        self.stores.contains(name)
    }

    /// Creates a store unless it already exists. Returns true if created.
    pub fn create_store(&mut self, name: &str) -> bool {
        if self.stores.insert(name.to_string()) {
            self.created.push(name.to_string());
            true
        } else {
            false
        }
    }
}

/// An open database.
#[derive(Debug)]
pub struct BlobDatabase {
    dir: PathBuf,
    manifest: RwLock<Manifest>,
}

impl BlobDatabase {
    /// Opens database `name` under `root` at schema `version`.
    ///
    /// If the stored version is lower (or the database is new), `upgrade`
    /// runs once before the new version is recorded.
    ///
    /// # Errors
    /// Returns error if the directory or manifest cannot be read or written,
    /// if the stored version is newer than `version`, or if `upgrade` fails.
    pub async fn open<F>(
        root: &Path,
        name: &str,
        version: u32,
        upgrade: F,
    ) -> Result<Self, StorageError>
    where
        F: FnOnce(&mut UpgradeTransaction<'_>) -> Result<(), StorageError>,
    {
        let dir = root.join(name);
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::unavailable(format!("failed to create {}: {e}", dir.display()))
        })?;
        sweep_partials(&dir).await;

        let manifest_path = dir.join(MANIFEST_FILE);
        let mut manifest = match fs::read(&manifest_path).await {
            Ok(bytes) => serde_json::from_slice::<Manifest>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Manifest {
                name: name.to_string(),
                version: 0,
                stores: BTreeSet::new(),
            },
            Err(e) => return Err(e.into()),
        };

        if manifest.version > version {
            return Err(StorageError::VersionDowngrade {
                found: manifest.version,
                requested: version,
            });
        }

        if manifest.version < version {
            let from = manifest.version;
            let mut tx = UpgradeTransaction {
                old_version: from,
                new_version: version,
                stores: &mut manifest.stores,
                created: Vec::new(),
            };
            upgrade(&mut tx).map_err(|e| StorageError::Upgrade {
                from,
                to: version,
                message: e.to_string(),
            })?;
            let created = tx.created;

            for store in &created {
                fs::create_dir_all(dir.join(store)).await?;
            }

            manifest.version = version;
            write_atomic(&manifest_path, &serde_json::to_vec_pretty(&manifest)?).await?;
            info!(database = name, from, to = version, created = ?created, "Upgraded blob database");
        }

        debug!(database = name, version, path = %dir.display(), "Opened blob database");
        Ok(Self {
            dir,
            manifest: RwLock::new(manifest),
        })
    }

    /// Returns the schema version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.manifest.read().version
    }

    /// Returns true if the store exists.
    #[must_use]
    pub fn has_store(&self, name: &str) -> bool {
        self.manifest.read().stores.contains(name)
    }

    /// Returns a handle to an existing store.
    ///
    /// # Errors
    /// Returns error if the store was never created.
    pub fn store(&self, name: &str) -> Result<ObjectStore, StorageError> {
        if !self.has_store(name) {
            return Err(StorageError::MissingStore(name.to_string()));
        }
        Ok(ObjectStore {
            dir: self.dir.join(name),
        })
    }
}

/// Record store inside a [`BlobDatabase`]. Each operation is atomic on its
/// own; there are no multi-record transactions.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    dir: PathBuf,
}

impl ObjectStore {
    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{RECORD_EXTENSION}"))
    }

    /// Reads a record.
    ///
    /// # Errors
    /// Returns error if the record exists but cannot be read or decoded.
    pub async fn get(&self, key: &str) -> Result<Option<BlobRecord>, StorageError> {
        let bytes = match fs::read(self.record_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: BlobRecord = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::corrupt(key, e.to_string()))?;
        if record.key != key {
            return Err(StorageError::corrupt(
                key,
                format!("record holds key `{}`", record.key),
            ));
        }
        Ok(Some(record))
    }

    /// Writes a record, replacing any previous one with the same key.
    ///
    /// # Errors
    /// Returns error if the record cannot be encoded or written.
    pub async fn put(&self, record: &BlobRecord) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec(record)?;
        write_atomic(&self.record_path(&record.key), &encoded).await?;
        Ok(())
    }

    /// Deletes a record. Returns true if one existed.
    ///
    /// # Errors
    /// Returns error if the record exists but cannot be removed.
    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(remove_if_exists(&self.record_path(key)).await?)
    }

    /// Returns true if a record exists for `key`.
    pub async fn contains(&self, key: &str) -> bool {
        fs::try_exists(self.record_path(key)).await.unwrap_or(false)
    }

    /// Counts stored records.
    ///
    /// # Errors
    /// Returns error if the store directory cannot be listed.
    pub async fn count(&self) -> Result<usize, StorageError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry
                .path()
                .extension()
                .is_some_and(|ext| ext == RECORD_EXTENSION)
            {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Serializes [`Bytes`] as standard base64.
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_images(tx: &mut UpgradeTransaction<'_>) -> Result<(), StorageError> {
        tx.create_store("images");
        Ok(())
    }

    #[tokio::test]
    async fn test_new_database_runs_upgrade() {
        let dir = TempDir::new().unwrap();
        let db = BlobDatabase::open(dir.path(), "db", 1, create_images).await.unwrap();

        assert_eq!(db.version(), 1);
        assert!(db.has_store("images"));
        assert!(dir.path().join("db").join(MANIFEST_FILE).exists());
    }

    #[tokio::test]
    async fn test_same_version_skips_upgrade() {
        let dir = TempDir::new().unwrap();
        BlobDatabase::open(dir.path(), "db", 1, create_images).await.unwrap();

        let db = BlobDatabase::open(dir.path(), "db", 1, |_| {
            panic!("upgrade must not run for an up-to-date database")
        })
        .await
        .unwrap();

        assert!(db.has_store("images"));
    }

    #[tokio::test]
    async fn test_upgrade_preserves_records() {
        let dir = TempDir::new().unwrap();
        let v1 = BlobDatabase::open(dir.path(), "db", 1, create_images).await.unwrap();
        let record = BlobRecord::new("k1", Bytes::from_static(b"img"), Utc::now(), Some(60));
        v1.store("images").unwrap().put(&record).await.unwrap();
        drop(v1);

        let v2 = BlobDatabase::open(dir.path(), "db", 2, |tx| {
            assert_eq!(tx.old_version(), 1);
            assert_eq!(tx.new_version(), 2);
            assert!(!tx.create_store("images"));
            assert!(tx.create_store("previews"));
            Ok(())
        })
        .await
        .unwrap();

        let stored = v2.store("images").unwrap().get("k1").await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert!(v2.has_store("previews"));
    }

    #[tokio::test]
    async fn test_downgrade_is_rejected() {
        let dir = TempDir::new().unwrap();
        BlobDatabase::open(dir.path(), "db", 3, create_images).await.unwrap();

        let err = BlobDatabase::open(dir.path(), "db", 2, create_images).await.unwrap_err();
        assert!(matches!(err, StorageError::VersionDowngrade { found: 3, requested: 2 }));
    }

    #[tokio::test]
    async fn test_failed_upgrade_keeps_old_version() {
        let dir = TempDir::new().unwrap();
        BlobDatabase::open(dir.path(), "db", 1, create_images).await.unwrap();

        let err = BlobDatabase::open(dir.path(), "db", 2, |_| {
            Err(StorageError::unavailable("boom"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StorageError::Upgrade { from: 1, to: 2, .. }));

        let db = BlobDatabase::open(dir.path(), "db", 1, create_images).await.unwrap();
        assert_eq!(db.version(), 1);
    }

    #[tokio::test]
    async fn test_missing_store() {
        let dir = TempDir::new().unwrap();
        let db = BlobDatabase::open(dir.path(), "db", 1, |_| Ok(())).await.unwrap();

        assert!(matches!(db.store("images"), Err(StorageError::MissingStore(_))));
    }

    #[tokio::test]
    async fn test_record_shape_on_disk() {
        let dir = TempDir::new().unwrap();
        let db = BlobDatabase::open(dir.path(), "db", 1, create_images).await.unwrap();
        let store = db.store("images").unwrap();
        let record = BlobRecord::new("k1", Bytes::from_static(b"img"), Utc::now(), None);
        store.put(&record).await.unwrap();

        let raw = fs::read(dir.path().join("db").join("images").join("k1.json")).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();

        assert_eq!(json["key"], "k1");
        assert_eq!(json["payload"], "aW1n");
        assert!(json["storedAt"].is_i64());
        assert!(json.get("expiresIn").is_none());
    }

    #[tokio::test]
    async fn test_store_delete_and_count() {
        let dir = TempDir::new().unwrap();
        let db = BlobDatabase::open(dir.path(), "db", 1, create_images).await.unwrap();
        let store = db.store("images").unwrap();

        for key in ["a", "b"] {
            let record = BlobRecord::new(key, Bytes::from_static(b"x"), Utc::now(), None);
            store.put(&record).await.unwrap();
        }
        assert_eq!(store.count().await.unwrap(), 2);

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(!store.contains("a").await);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let dir = TempDir::new().unwrap();
        let db = BlobDatabase::open(dir.path(), "db", 1, create_images).await.unwrap();
        let store = db.store("images").unwrap();
        fs::write(dir.path().join("db").join("images").join("k1.json"), b"garbage")
            .await
            .unwrap();

        assert!(matches!(store.get("k1").await, Err(StorageError::Corrupt { .. })));
    }
}
