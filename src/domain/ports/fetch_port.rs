//! Network fetch port definition.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::RemoteImage;
use crate::domain::errors::FetchError;

/// Port for downloading remote images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Downloads the full body of `image`.
    ///
    /// Only 2xx responses succeed; the body is read completely before
    /// returning.
    async fn fetch(&self, image: &RemoteImage) -> Result<Bytes, FetchError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    /// Scriptable fetcher that counts requests and can hold them back.
    pub struct MockFetcher {
        responses: Mutex<HashMap<String, Result<Bytes, FetchError>>>,
        calls: AtomicUsize,
        gated: AtomicBool,
        gate: Arc<Semaphore>,
    }

    impl MockFetcher {
        /// Creates a fetcher that answers 404 for unknown URIs.
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: AtomicUsize::new(0),
                gated: AtomicBool::new(false),
                gate: Arc::new(Semaphore::new(0)),
            }
        }

        /// Serves `body` for `uri`.
        pub fn with_body(self, uri: &str, body: &'static [u8]) -> Self {
            self.responses
                .lock()
                .insert(uri.to_string(), Ok(Bytes::from_static(body)));
            self
        }

        /// Fails requests for `uri` with `error`.
        pub fn with_error(self, uri: &str, error: FetchError) -> Self {
            self.responses.lock().insert(uri.to_string(), Err(error));
            self
        }

        /// Holds every request until [`MockFetcher::release`] is called.
        pub fn gated(self) -> Self {
            self.gated.store(true, Ordering::SeqCst);
            self
        }

        /// Lets `n` held requests complete.
        pub fn release(&self, n: usize) {
            self.gate.add_permits(n);
        }

        /// Number of fetches issued so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Default for MockFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ImageFetcher for MockFetcher {
        async fn fetch(&self, image: &RemoteImage) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.gated.load(Ordering::SeqCst) {
                let permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|e| FetchError::request(e.to_string()))?;
                permit.forget();
            }
            self.responses
                .lock()
                .get(image.uri())
                .cloned()
                .unwrap_or(Err(FetchError::Status { status: 404 }))
        }
    }
}
