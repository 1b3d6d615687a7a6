//! Display-instance input DTOs.

use crate::domain::entities::RemoteImage;

/// Low-resolution placeholder shown while the main image resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSource {
    /// Remote URI of the preview.
    pub uri: String,
    /// Unsanitized cache key of the preview.
    pub key: String,
}

impl PreviewSource {
    /// Creates a preview source.
    #[must_use]
    pub fn new(uri: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            key: key.into(),
        }
    }
}

/// Input of one image display instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Remote image and its request headers.
    pub image: RemoteImage,
    /// Unsanitized cache key.
    pub key: String,
    /// Entry lifetime in seconds.
    pub expires_in: Option<u64>,
    /// Optional placeholder.
    pub preview: Option<PreviewSource>,
    /// Defer resolving until the instance becomes visible.
    pub lazy: bool,
}

impl ImageRequest {
    /// Creates an eager request without expiry or preview.
    #[must_use]
    pub fn new(image: impl Into<RemoteImage>, key: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            key: key.into(),
            expires_in: None,
            preview: None,
            lazy: false,
        }
    }

    /// Sets the entry lifetime.
    #[must_use]
    pub const fn with_expires_in(mut self, secs: u64) -> Self {
        self.expires_in = Some(secs);
        self
    }

    /// Sets the preview placeholder.
    #[must_use]
    pub fn with_preview(mut self, preview: PreviewSource) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Defers resolving until visible.
    #[must_use]
    pub const fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Returns true if `other` targets the same image.
    ///
    /// Only the URI and the key identify the main image; headers, expiry and
    /// laziness do not trigger a reload.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        self.image.uri() == other.image.uri() && self.key == other.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_target_ignores_options() {
        let a = ImageRequest::new("https://x/a.png", "a");
        let b = ImageRequest::new(RemoteImage::new("https://x/a.png").with_header("X-A", "1"), "a")
            .with_expires_in(60)
            .lazy();

        assert!(a.same_target(&b));
        assert!(!a.same_target(&ImageRequest::new("https://x/a.png", "other")));
        assert!(!a.same_target(&ImageRequest::new("https://x/b.png", "a")));
    }
}
