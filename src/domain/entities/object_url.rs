//! Transient object URLs for blob-backed handles.
//!
//! A browser hands out `blob:` URLs that keep a payload reachable until they
//! are revoked. [`ObjectUrlRegistry`] models that table; each [`ObjectUrl`]
//! owns exactly one registration and revokes it when dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{trace, warn};

/// Scheme and origin prefix of every URL the registry creates.
pub const OBJECT_URL_PREFIX: &str = "blob:imgstash/";

/// Table of live object URLs.
#[derive(Default)]
pub struct ObjectUrlRegistry {
    live: Mutex<HashMap<String, Bytes>>,
    created: AtomicU64,
    revoked: AtomicU64,
}

impl ObjectUrlRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `payload` under a fresh URL.
    #[must_use]
    pub fn create(self: &Arc<Self>, payload: Bytes) -> ObjectUrl {
        let url = format!("{OBJECT_URL_PREFIX}{}", uuid::Uuid::new_v4());
        self.live.lock().insert(url.clone(), payload.clone());
        self.created.fetch_add(1, Ordering::Relaxed);
        trace!(url = %url, size = payload.len(), "Created object URL");

        ObjectUrl {
            url,
            payload,
            registry: Arc::clone(self),
        }
    }

    /// Returns the payload behind a live URL.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        self.live.lock().get(url).cloned()
    }

    /// Revokes a URL. Returns false if it was not live.
    pub fn revoke(&self, url: &str) -> bool {
        if self.live.lock().remove(url).is_some() {
            self.revoked.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, "Revoked object URL");
            true
        } else {
            warn!(url = %url, "Ignoring revoke of unknown object URL");
            false
        }
    }

    /// Number of URLs currently live.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Total URLs ever created.
    #[must_use]
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Total successful revocations.
    #[must_use]
    pub fn revoked_count(&self) -> u64 {
        self.revoked.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for ObjectUrlRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectUrlRegistry")
            .field("live", &self.live_count())
            .field("created", &self.created_count())
            .field("revoked", &self.revoked_count())
            .finish()
    }
}

/// An owned object URL, revoked exactly once when dropped.
pub struct ObjectUrl {
    url: String,
    payload: Bytes,
    registry: Arc<ObjectUrlRegistry>,
}

impl ObjectUrl {
    /// Returns the URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Returns the payload the URL refers to.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}

impl fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectUrl")
            .field("url", &self.url)
            .field("size", &self.payload.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.create(Bytes::from_static(b"png"));

        assert!(url.as_str().starts_with(OBJECT_URL_PREFIX));
        assert_eq!(registry.resolve(url.as_str()).unwrap(), &b"png"[..]);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_drop_revokes_once() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.create(Bytes::from_static(b"png"));
        let raw = url.as_str().to_string();

        drop(url);

        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.revoked_count(), 1);
        assert!(registry.resolve(&raw).is_none());
        assert!(!registry.revoke(&raw));
        assert_eq!(registry.revoked_count(), 1);
    }

    #[test]
    fn test_urls_are_unique() {
        let registry = ObjectUrlRegistry::new();
        let a = registry.create(Bytes::from_static(b"x"));
        let b = registry.create(Bytes::from_static(b"x"));

        assert_ne!(a.as_str(), b.as_str());
        assert_eq!(registry.created_count(), 2);
    }
}
