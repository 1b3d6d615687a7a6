//! Cache key sanitization.
//!
//! Maps arbitrary caller-supplied keys to identifiers that are valid both as a
//! single filesystem path segment and as an object-store key, so one sanitized
//! key addresses the same entry on either storage backend.

use sha2::{Digest, Sha256};

/// Longest sanitized key, in bytes.
pub const MAX_KEY_LEN: usize = 128;

/// Hex digits of the raw-key digest appended to truncated keys.
const DIGEST_HEX_LEN: usize = 16;

/// Substitute for any disallowed character.
const REPLACEMENT: char = '_';

/// Windows device names. A file whose stem matches one of these, in any case
/// and with any extension, opens the device instead.
const RESERVED_STEMS: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Maps a raw cache key to a storage-safe identifier.
///
/// The mapping is total and idempotent. Every output consists only of ASCII
/// alphanumerics, `-`, `_` and `.`, never starts with `.`, never has a
/// Windows device name as its stem, is never empty and is at most
/// [`MAX_KEY_LEN`] bytes long.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let mut safe: String = raw
        .chars()
        .map(|c| if is_allowed(c) { c } else { REPLACEMENT })
        .collect();

    let leading_dots = safe.bytes().take_while(|b| *b == b'.').count();
    if leading_dots > 0 {
        safe.replace_range(..leading_dots, &"_".repeat(leading_dots));
    }

    if safe.is_empty() {
        return REPLACEMENT.to_string();
    }

    let stem_len = stem(&safe).len();
    if is_reserved_stem(&safe[..stem_len]) {
        safe.insert(stem_len, REPLACEMENT);
    }

    if safe.len() > MAX_KEY_LEN {
        let digest = Sha256::digest(raw.as_bytes());
        let suffix = &hex::encode(digest)[..DIGEST_HEX_LEN];
        safe.truncate(MAX_KEY_LEN - DIGEST_HEX_LEN - 1);
        safe.push('-');
        safe.push_str(suffix);
    }

    safe
}

/// Returns true if `key` is already in sanitized form.
#[must_use]
pub fn is_sanitized(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && !key.starts_with('.')
        && !is_reserved_stem(stem(key))
        && key.chars().all(is_allowed)
}

fn stem(key: &str) -> &str {
    key.split('.').next().unwrap_or(key)
}

fn is_reserved_stem(stem: &str) -> bool {
    RESERVED_STEMS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

const fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}
