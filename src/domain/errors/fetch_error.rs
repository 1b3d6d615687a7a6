//! Network fetch error types.

use thiserror::Error;

/// Failures while downloading a remote image.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum FetchError {
    #[error("request failed: {message}")]
    Request { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("failed to read body: {message}")]
    Body { message: String },

    #[error("response body was empty")]
    EmptyBody,

    #[error("invalid header `{name}`")]
    InvalidHeader { name: String },
}

impl FetchError {
    /// Creates request error.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Creates body error.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body {
            message: message.into(),
        }
    }
}
