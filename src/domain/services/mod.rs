//! Pure domain services.

pub mod key_sanitizer;

pub use key_sanitizer::{is_sanitized, sanitize};
