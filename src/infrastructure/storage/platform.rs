//! Platform-driven backend selection.

use std::sync::Arc;

use tracing::info;

use super::{BlobStorage, FileStorage};
use crate::domain::ports::{Clock, ImageFetcher, StorageBackend};
use crate::infrastructure::config::{BackendKind, CacheConfig};

/// Runtime platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Browser build: blob database plus object URLs.
    Web,
    /// Native build: plain files.
    Native,
}

impl Platform {
    /// Detects the platform of the current build.
    #[must_use]
    pub const fn detect() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::Web
        } else {
            Self::Native
        }
    }
}

impl BackendKind {
    /// Returns the platform whose backend this selection builds.
    #[must_use]
    pub const fn platform(self, detected: Platform) -> Platform {
        match self {
            Self::Auto => detected,
            Self::Blob => Platform::Web,
            Self::File => Platform::Native,
        }
    }
}

/// Builds the process-wide storage backend.
///
/// The backend is constructed once and shared by every consumer; nothing is
/// opened until the first operation.
#[must_use]
pub fn create_backend(
    platform: Platform,
    config: &CacheConfig,
    fetcher: Arc<dyn ImageFetcher>,
    clock: Arc<dyn Clock>,
) -> Arc<dyn StorageBackend> {
    let root = config.effective_directory();
    info!(platform = ?platform, root = %root.display(), "Creating storage backend");

    match platform {
        Platform::Web => Arc::new(
            BlobStorage::new(root, fetcher, clock)
                .with_database(config.database_name.clone(), config.schema_version),
        ),
        Platform::Native => Arc::new(
            FileStorage::new(root, fetcher, clock).with_extension(config.file_extension.clone()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::{ManualClock, MockFetcher};

    #[test]
    fn test_backend_kind_platform() {
        assert_eq!(BackendKind::Blob.platform(Platform::Native), Platform::Web);
        assert_eq!(BackendKind::File.platform(Platform::Web), Platform::Native);
        assert_eq!(BackendKind::Auto.platform(Platform::Web), Platform::Web);
    }

    #[test]
    fn test_detect_native() {
        assert_eq!(Platform::detect(), Platform::Native);
    }

    #[test]
    fn test_create_backend_by_platform() {
        let config = CacheConfig::default();
        let fetcher: Arc<dyn ImageFetcher> = Arc::new(MockFetcher::new());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());

        let web = create_backend(Platform::Web, &config, fetcher.clone(), clock.clone());
        let native = create_backend(Platform::Native, &config, fetcher, clock);

        assert_eq!(web.name(), "blob");
        assert_eq!(native.name(), "file");
    }
}
