//! Persisted cache entry and its expiry rule.

use chrono::{DateTime, TimeDelta, Utc};

use super::ResolvedHandle;

/// Returns true if an entry written at `stored_at` with lifetime
/// `expires_in` seconds is stale at `now`.
///
/// Entries without a lifetime never expire. The boundary is exclusive: an
/// entry exactly `expires_in` seconds old is still fresh.
#[must_use]
pub fn is_expired_at(stored_at: DateTime<Utc>, expires_in: Option<u64>, now: DateTime<Utc>) -> bool {
    let Some(secs) = expires_in else {
        return false;
    };
    let lifetime = i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX);
    now.signed_duration_since(stored_at) > lifetime
}

/// A cache hit as returned by a storage backend.
#[derive(Debug)]
pub struct CacheEntry {
    handle: ResolvedHandle,
    size: u64,
    stored_at: DateTime<Utc>,
    expires_in: Option<u64>,
}

impl CacheEntry {
    /// Creates an entry.
    #[must_use]
    pub const fn new(
        handle: ResolvedHandle,
        size: u64,
        stored_at: DateTime<Utc>,
        expires_in: Option<u64>,
    ) -> Self {
        Self {
            handle,
            size,
            stored_at,
            expires_in,
        }
    }

    /// Returns the handle to the payload.
    #[must_use]
    pub const fn handle(&self) -> &ResolvedHandle {
        &self.handle
    }

    /// Payload size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Lifetime in seconds, if any.
    #[must_use]
    pub const fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    /// Returns true if the entry is stale at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired_at(self.stored_at, self.expires_in, now)
    }

    /// Consumes the entry, keeping only its handle.
    #[must_use]
    pub fn into_handle(self) -> ResolvedHandle {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_no_lifetime_never_expires() {
        assert!(!is_expired_at(at(0), None, at(10_000_000)));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        assert!(!is_expired_at(at(100), Some(60), at(160)));
        assert!(is_expired_at(at(100), Some(60), at(161)));
    }

    #[test]
    fn test_one_second_lifetime_after_two_seconds() {
        assert!(is_expired_at(at(100), Some(1), at(102)));
    }

    #[test]
    fn test_clock_skew_keeps_entry_fresh() {
        assert!(!is_expired_at(at(200), Some(1), at(100)));
    }

    #[test]
    fn test_huge_lifetime_does_not_overflow() {
        assert!(!is_expired_at(at(0), Some(u64::MAX), at(1_000_000)));
    }

    #[test]
    fn test_entry_accessors() {
        let entry = CacheEntry::new(
            ResolvedHandle::remote("https://x/img.png"),
            3,
            at(5),
            Some(60),
        );

        assert_eq!(entry.size(), 3);
        assert!(!entry.is_expired(at(65)));
        assert!(entry.is_expired(at(66)));
        assert_eq!(entry.into_handle().uri(), "https://x/img.png");
    }
}
