//! HTTP client module
//!
//! Provides the transport seam, the reqwest client behind it, and the retry
//! and classification layer the stream engine drives.
//!
//! # Features
//!
//! - **Classification**: tolerated / retriable / fatal / success per resource
//! - **Automatic Retries**: bounded attempts with exponential backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Response Cache**: optional in-memory cache of successful pages

mod cache;
mod classify;
mod client;
mod rate_limit;
mod retry;
mod transport;

pub use cache::{CacheConfig, ResponseCache};
pub use classify::{ErrorClassifier, ResponseClass};
pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, PULUMI_ACCEPT};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{send_with_retry, Outcome, RetryPolicy};
pub use transport::{build_url, HttpRequest, HttpResponse, Transport};
