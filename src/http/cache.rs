//! In-memory response cache
//!
//! Successful responses are kept per URL and request headers for the
//! configured lifetime. Nothing is written to disk.

use super::transport::{HttpRequest, HttpResponse};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cache settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entry lifetime; `None` keeps entries for the whole run
    pub expire_after: Option<Duration>,
}

impl CacheConfig {
    /// Entries expire after `ttl`
    pub fn expiring(ttl: Duration) -> Self {
        Self {
            expire_after: Some(ttl),
        }
    }
}

#[derive(Debug)]
struct Entry {
    stored_at: Instant,
    response: HttpResponse,
}

/// Response cache keyed by URL and sorted headers
#[derive(Debug, Default)]
pub struct ResponseCache {
    config: CacheConfig,
    entries: Mutex<HashMap<String, Entry>>,
}

impl ResponseCache {
    /// Create an empty cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache key for a request
    pub fn key(request: &HttpRequest) -> String {
        let mut headers: Vec<String> = request
            .headers
            .iter()
            .map(|(k, v)| format!("{}={v}", k.to_ascii_lowercase()))
            .collect();
        headers.sort();
        format!("{} {}", request.url, headers.join("&"))
    }

    /// Fresh cached response for a request
    pub fn get(&self, request: &HttpRequest) -> Option<HttpResponse> {
        let key = Self::key(request);
        let mut entries = self.entries.lock().ok()?;

        let entry = entries.get(&key)?;
        if let Some(ttl) = self.config.expire_after {
            if entry.stored_at.elapsed() >= ttl {
                entries.remove(&key);
                return None;
            }
        }
        Some(entry.response.clone())
    }

    /// Store a response; only 2xx responses are kept
    pub fn put(&self, request: &HttpRequest, response: &HttpResponse) {
        if !response.is_success() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                Self::key(request),
                Entry {
                    stored_at: Instant::now(),
                    response: response.clone(),
                },
            );
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
