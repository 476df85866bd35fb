//! HTTP client with rate limiting and response caching
//!
//! One [`HttpClient`] serves the whole tap run. It performs single attempts;
//! retries are layered on top by [`super::send_with_retry`].

use super::cache::{CacheConfig, ResponseCache};
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Media type selecting the Pulumi Cloud API version
pub const PULUMI_ACCEPT: &str = "application/vnd.pulumi+8";

/// Configuration for the HTTP client
#[derive(Clone)]
pub struct HttpClientConfig {
    /// API token sent as `Authorization: token <TOKEN>`
    pub token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Response cache configuration
    pub cache: Option<CacheConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        let default_headers = HashMap::from([
            (ACCEPT.as_str().to_string(), PULUMI_ACCEPT.to_string()),
            (CONTENT_TYPE.as_str().to_string(), "application/json".to_string()),
        ]);
        Self {
            token: None,
            timeout: Duration::from_secs(30),
            rate_limit: Some(RateLimiterConfig::default()),
            cache: None,
            default_headers,
            user_agent: format!("tap-pulumi-cloud/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl std::fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("rate_limit", &self.rate_limit)
            .field("cache", &self.cache)
            .field("default_headers", &self.default_headers)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the API token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Enable the response cache
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.config.cache = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// reqwest-backed [`Transport`]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
    cache: Option<ResponseCache>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);
        let cache = config.cache.clone().map(ResponseCache::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
            cache,
        })
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// The response cache, if enabled
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn timeout_error(&self) -> Error {
        Error::Timeout {
            timeout_ms: self.config.timeout.as_millis() as u64,
        }
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(request)) {
            debug!("Cache hit: GET {}", request.url);
            return Ok(cached);
        }

        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self.client.get(&request.url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if let Some(token) = &self.config.token {
            req = req.header(AUTHORIZATION, format!("token {token}"));
        }
        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        debug!("GET {}", request.url);
        let response = match req.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Err(self.timeout_error()),
            Err(e) => return Err(Error::Http(e)),
        };

        let status = response.status();
        let url = response.url().to_string();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Err(self.timeout_error()),
            Err(e) => return Err(Error::Http(e)),
        };

        let response = HttpResponse::new(status.as_u16(), url, body);

        if let Some(cache) = &self.cache {
            cache.put(request, &response);
        }

        Ok(response)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .field("has_cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}
