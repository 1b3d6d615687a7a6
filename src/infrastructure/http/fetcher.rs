//! HTTP image fetcher.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::domain::entities::RemoteImage;
use crate::domain::errors::FetchError;
use crate::domain::ports::ImageFetcher;
use crate::infrastructure::config::HttpConfig;

/// Downloads images with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    /// Creates a fetcher from configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn headers(image: &RemoteImage) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::with_capacity(image.headers().len());
        for (name, value) in image.headers() {
            let invalid = || FetchError::InvalidHeader { name: name.clone() };
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.append(name, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, image: &RemoteImage) -> Result<Bytes, FetchError> {
        let headers = Self::headers(image)?;

        debug!(uri = %image.uri(), "Fetching image");

        let response = self
            .client
            .get(image.uri())
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                warn!(uri = %image.uri(), error = %e, "Image request failed");
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::body(e.to_string())
            }
        })?;

        if bytes.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        debug!(uri = %image.uri(), size = bytes.len(), "Fetched image");
        Ok(bytes)
    }
}
