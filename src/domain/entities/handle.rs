//! Locally resolvable image handles.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::warn;

use super::ObjectUrl;

/// Where a handle's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// In-memory blob behind an object URL.
    ObjectUrl,
    /// File in the native cache directory.
    File,
    /// Uncached remote URI, used when caching failed.
    Remote,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectUrl => write!(f, "object-url"),
            Self::File => write!(f, "file"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Reference to image bytes handed to the rendering layer.
///
/// Handles are not `Clone`: an object-URL handle revokes its URL when dropped,
/// so ownership decides when the release happens.
pub enum ResolvedHandle {
    /// Blob materialized as an object URL.
    ObjectUrl(ObjectUrl),
    /// Cached file with a cache-busting URI.
    File {
        /// Location of the cached payload.
        path: PathBuf,
        /// `file://` URI including the cache-buster query.
        uri: String,
    },
    /// The original remote URI, returned unmodified.
    Remote(String),
}

impl ResolvedHandle {
    /// Creates a file handle whose URI changes whenever `version` changes.
    #[must_use]
    pub fn file(path: PathBuf, version: i64) -> Self {
        let uri = format!("file://{}?v={version}", path.display());
        Self::File { path, uri }
    }

    /// Creates a fallback handle for an uncached URI.
    #[must_use]
    pub fn remote(uri: impl Into<String>) -> Self {
        Self::Remote(uri.into())
    }

    /// Returns the URI the renderer should load.
    #[must_use]
    pub fn uri(&self) -> &str {
        match self {
            Self::ObjectUrl(url) => url.as_str(),
            Self::File { uri, .. } => uri,
            Self::Remote(uri) => uri,
        }
    }

    /// Returns the handle kind.
    #[must_use]
    pub const fn kind(&self) -> HandleKind {
        match self {
            Self::ObjectUrl(_) => HandleKind::ObjectUrl,
            Self::File { .. } => HandleKind::File,
            Self::Remote(_) => HandleKind::Remote,
        }
    }

    /// Returns the cached file path for file handles.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Returns true if the handle refers to locally cached bytes.
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        !matches!(self, Self::Remote(_))
    }

    /// Reads the bytes behind a local handle.
    /// Returns None for remote handles and unreadable files.
    pub async fn load_bytes(&self) -> Option<Bytes> {
        match self {
            Self::ObjectUrl(url) => Some(url.payload().clone()),
            Self::File { path, .. } => match tokio::fs::read(path).await {
                Ok(bytes) => Some(Bytes::from(bytes)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read cached file");
                    None
                }
            },
            Self::Remote(_) => None,
        }
    }
}

impl fmt::Debug for ResolvedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedHandle")
            .field("kind", &self.kind())
            .field("uri", &self.uri())
            .finish()
    }
}
