//! Storage-safe cache key value object.

use std::fmt;

use crate::domain::services::sanitize;

/// Sanitized identifier of a cached resource.
///
/// Always constructed through [`sanitize`], so a `CacheKey` is valid as a file
/// name and as an object-store key alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from any caller-supplied string.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(sanitize(raw.as_ref()))
    }

    /// Returns the sanitized key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
