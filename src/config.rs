//! Tap configuration
//!
//! The settings a user supplies in the config file, plus the derived client
//! and engine configuration.

use crate::engine::EngineConfig;
use crate::error::{Error, Result};
use crate::http::{CacheConfig, HttpClientConfig, RateLimiterConfig, RetryPolicy};
use crate::types::BackoffType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Pulumi Cloud API endpoint
pub const DEFAULT_API_URL: &str = "https://api.pulumi.com";

// ============================================================================
// Top-Level Tap Config
// ============================================================================

/// Complete tap configuration loaded from JSON or YAML
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TapConfig {
    /// Pulumi Cloud access token
    pub token: String,

    /// Organizations to extract
    pub organizations: Vec<String>,

    /// Earliest record time for incremental streams
    #[serde(default, deserialize_with = "deserialize_start_date")]
    pub start_date: Option<DateTime<Utc>>,

    /// Response cache settings
    #[serde(default)]
    pub requests_cache: RequestsCacheConfig,

    /// Register the enterprise-only streams
    #[serde(default)]
    pub enterprise_streams: bool,

    /// API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Retries after the first attempt of a request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay curve between retries
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Client-side request rate limit
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_requests_per_second() -> u32 {
    10
}

/// `retry_backoff` block
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60_000
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC)
fn deserialize_start_date<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_start_date(&raw).map(Some).map_err(serde::de::Error::custom)
}

/// Parse a start date in either accepted form
pub fn parse_start_date(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid start_date '{raw}': expected RFC 3339 or YYYY-MM-DD"))
}

// ============================================================================
// Requests Cache
// ============================================================================

/// `requests_cache` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestsCacheConfig {
    /// Whether responses are cached
    #[serde(default)]
    pub enabled: bool,

    /// Cache options
    #[serde(default)]
    pub config: RequestsCacheOptions,
}

/// Options under `requests_cache.config`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestsCacheOptions {
    /// Entry lifetime in seconds
    #[serde(default)]
    pub expire_after: Option<u64>,
}

impl RequestsCacheConfig {
    /// Client cache settings, if enabled
    pub fn cache_config(&self) -> Option<CacheConfig> {
        self.enabled.then(|| CacheConfig {
            expire_after: self.config.expire_after.map(Duration::from_secs),
        })
    }
}

// ============================================================================
// Loading and Validation
// ============================================================================

impl TapConfig {
    /// Minimal config for the given token and organizations
    pub fn new(token: impl Into<String>, organizations: Vec<String>) -> Self {
        Self {
            token: token.into(),
            organizations,
            start_date: None,
            requests_cache: RequestsCacheConfig::default(),
            enterprise_streams: false,
            api_url: default_api_url(),
            user_agent: None,
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            timeout_seconds: default_timeout_seconds(),
            requests_per_second: default_requests_per_second(),
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML config
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; `.yaml` and `.yml` are read as YAML, anything
    /// else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            _ => Self::from_json_str(&contents),
        }
    }

    /// Check required settings
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::missing_field("token"));
        }
        if self.organizations.is_empty() {
            return Err(Error::invalid_value(
                "organizations",
                "at least one organization is required",
            ));
        }
        if let Some(org) = self.organizations.iter().find(|o| o.trim().is_empty()) {
            return Err(Error::invalid_value(
                "organizations",
                format!("organization name '{org}' is empty"),
            ));
        }
        if self.requests_per_second == 0 {
            return Err(Error::invalid_value(
                "requests_per_second",
                "must be greater than zero",
            ));
        }
        if self.retry_backoff.max_ms < self.retry_backoff.initial_ms {
            return Err(Error::invalid_value(
                "retry_backoff",
                "max_ms must not be below initial_ms",
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::invalid_value("timeout_seconds", "must be greater than zero"));
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| Error::invalid_value("api_url", e.to_string()))?;
        Ok(())
    }

    /// Retry policy with the configured bound and delay curve
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_retries(self.max_retries).backoff(
            self.retry_backoff.backoff_type,
            Duration::from_millis(self.retry_backoff.initial_ms),
            Duration::from_millis(self.retry_backoff.max_ms),
        )
    }

    /// HTTP client settings derived from this config
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .token(self.token.clone())
            .timeout(Duration::from_secs(self.timeout_seconds))
            .rate_limit(RateLimiterConfig::per_second(self.requests_per_second));

        if let Some(cache) = self.requests_cache.cache_config() {
            builder = builder.cache(cache);
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        builder.build()
    }

    /// Engine settings; the signpost is the current instant
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.api_url.clone())
            .with_retry(self.retry_policy())
            .with_start_date(self.start_date)
    }
}

impl std::fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapConfig")
            .field("token", &"<redacted>")
            .field("organizations", &self.organizations)
            .field("start_date", &self.start_date)
            .field("requests_cache", &self.requests_cache)
            .field("enterprise_streams", &self.enterprise_streams)
            .field("api_url", &self.api_url)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}
