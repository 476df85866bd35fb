//! Retry loop over a [`Transport`]
//!
//! Each attempt is classified; retriable failures back off and try again up
//! to `max_retries` times before turning fatal.

use super::classify::{ErrorClassifier, ResponseClass};
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::error::{Error, Result};
use crate::types::BackoffType;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backoff and retry bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Growth of the delay between retries
    pub backoff_type: BackoffType,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Policy with a retry bound and default backoff
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Set backoff configuration
    #[must_use]
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }
}

/// Final result of a request after retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Usable response
    Success(HttpResponse),
    /// Tolerated failure; the caller treats it as zero records
    Tolerated(HttpResponse),
}

/// Send a request, retrying transient failures
///
/// `stream` only labels errors and log lines.
pub async fn send_with_retry(
    transport: &dyn Transport,
    request: &HttpRequest,
    classifier: &ErrorClassifier,
    policy: &RetryPolicy,
    stream: &str,
) -> Result<Outcome> {
    let attempts = policy.max_retries + 1;
    let mut attempt = 0;

    loop {
        let last_status = match transport.send(request).await {
            Ok(response) => match classifier.classify(response.status) {
                ResponseClass::Success => {
                    debug!("Request succeeded: GET {}", request.url);
                    return Ok(Outcome::Success(response));
                }
                ResponseClass::Tolerated => {
                    info!(
                        "Tolerating {} {} for stream '{}': {}",
                        response.status, response.reason, stream, request.url
                    );
                    return Ok(Outcome::Tolerated(response));
                }
                ResponseClass::Fatal => {
                    return Err(Error::fatal_request(
                        stream,
                        &request.url,
                        response.status,
                        response.reason,
                    ));
                }
                ResponseClass::Retriable => {
                    format!("{} {}", response.status, response.reason)
                }
            },
            Err(e) if e.is_retryable() => e.to_string(),
            Err(e) => return Err(e),
        };

        if attempt >= policy.max_retries {
            return Err(Error::RetriesExhausted {
                url: request.url.clone(),
                attempts,
                last_status,
            });
        }

        let delay = policy.calculate_backoff(attempt);
        warn!(
            "Request failed with {}, attempt {}/{}, retrying in {:?}",
            last_status,
            attempt + 1,
            attempts,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
