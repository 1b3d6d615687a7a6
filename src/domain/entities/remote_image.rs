//! Remote image request description.

/// A remote image together with the headers to send when fetching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImage {
    uri: String,
    headers: Vec<(String, String)>,
}

impl RemoteImage {
    /// Creates a request without extra headers.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            headers: Vec::new(),
        }
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces all request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Returns the remote URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl From<&str> for RemoteImage {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for RemoteImage {
    fn from(uri: String) -> Self {
        Self::new(uri)
    }
}
