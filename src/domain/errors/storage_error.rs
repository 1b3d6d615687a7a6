//! Storage backend error types.

use thiserror::Error;

/// Failures inside a storage backend.
///
/// These never reach callers of the caching operations: backends log them and
/// report a miss or a failed write instead.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("schema upgrade from version {from} to {to} failed: {message}")]
    Upgrade { from: u32, to: u32, message: String },

    #[error("database version {found} is newer than requested version {requested}")]
    VersionDowngrade { found: u32, requested: u32 },

    #[error("record store `{0}` does not exist")]
    MissingStore(String),

    #[error("corrupt record `{key}`: {message}")]
    Corrupt { key: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Creates unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates corrupt record error.
    #[must_use]
    pub fn corrupt(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns whether the backend as a whole is unusable.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. }
                | Self::Upgrade { .. }
                | Self::VersionDowngrade { .. }
                | Self::MissingStore(_)
        )
    }
}
