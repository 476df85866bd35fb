//! Transport seam
//!
//! The stream engine only talks to a [`Transport`]; [`super::HttpClient`] is
//! the reqwest-backed implementation and tests substitute their own.

use crate::error::Result;
use async_trait::async_trait;
use url::Url;

/// A GET request for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Fully built URL including query string
    pub url: String,
    /// Request-specific headers
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Create a GET request for a URL
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// A fully read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Reason phrase for the status
    pub reason: String,
    /// Final URL of the response
    pub url: String,
    /// Raw body text
    pub body: String,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();
        Self {
            status,
            reason,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can execute a single HTTP attempt
///
/// Implementations do not retry; classification and backoff happen above.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and read the whole response
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Join a base URL and a path (which may carry a fixed query string), then
/// append query parameters in order
pub fn build_url(base: &str, path: &str, params: &[(String, String)]) -> Result<Url> {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let mut url = Url::parse(&format!("{base}/{path}"))?;

    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}
