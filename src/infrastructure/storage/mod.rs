//! Persistent image storage backends.

mod atomic;
pub mod blob_database;
pub mod blob_storage;
pub mod file_storage;
pub mod platform;

pub use blob_database::{BlobDatabase, BlobRecord, ObjectStore, UpgradeTransaction};
pub use blob_storage::{BlobStorage, DEFAULT_DATABASE_NAME, IMAGE_STORE, SCHEMA_VERSION};
pub use file_storage::{DEFAULT_EXTENSION, FileStorage};
pub use platform::{Platform, create_backend};
