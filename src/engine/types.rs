//! Engine types
//!
//! Message types, configuration and statistics for the stream engine.

use crate::config::DEFAULT_API_URL;
use crate::error::Result;
use crate::http::RetryPolicy;
use crate::types::Record;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

/// A message emitted during sync
///
/// Serializes to the Singer wire form, e.g.
/// `{"type": "RECORD", "stream": "stacks", "record": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message {
    /// One record
    Record {
        /// Stream name
        stream: String,
        /// The record
        record: Record,
    },
    /// Full state after a bookmark moved
    State {
        /// State document
        value: Value,
    },
}

impl Message {
    /// Create a record message
    pub fn record(stream: impl Into<String>, record: Record) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
        }
    }

    /// Create a state message
    pub fn state(value: Value) -> Self {
        Self::State { value }
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Stream of a record message
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }
}

/// Destination for emitted messages
pub trait MessageSink: Send {
    /// Accept one message
    fn emit(&mut self, message: Message) -> Result<()>;
}

impl MessageSink for Vec<Message> {
    fn emit(&mut self, message: Message) -> Result<()> {
        self.push(message);
        Ok(())
    }
}

/// Configuration for the stream engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// API base URL
    pub base_url: String,
    /// Retry and backoff bounds
    pub retry: RetryPolicy,
    /// Extra statuses to retry besides 5xx and 429
    pub retry_statuses: Vec<u16>,
    /// Earliest replication value when no bookmark exists
    pub start_date: Option<DateTime<Utc>>,
    /// Instant the sync started; caps bookmarks and bounds cursors
    pub signpost: DateTime<Utc>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            retry: RetryPolicy::default(),
            retry_statuses: Vec::new(),
            start_date: None,
            signpost: Utc::now(),
        }
    }
}

impl EngineConfig {
    /// Create a config for a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the start date
    #[must_use]
    pub fn with_start_date(mut self, start_date: Option<DateTime<Utc>>) -> Self {
        self.start_date = start_date;
        self
    }

    /// Set the signpost
    #[must_use]
    pub fn with_signpost(mut self, signpost: DateTime<Utc>) -> Self {
        self.signpost = signpost;
        self
    }

    /// The signpost as a replication value
    pub fn signpost_value(&self) -> Value {
        Value::String(self.signpost.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Records emitted
    pub records_synced: usize,
    /// Pages fetched
    pub pages_fetched: usize,
    /// Partitions (fetch contexts) completed
    pub partitions_synced: usize,
    /// Bookmarks advanced
    pub bookmarks_advanced: usize,
    /// `label: error` for each resource partition that failed
    pub failures: Vec<String>,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add pages
    pub fn add_pages(&mut self, count: usize) {
        self.pages_fetched += count;
    }

    /// Add a partition
    pub fn add_partition(&mut self) {
        self.partitions_synced += 1;
    }

    /// Add a bookmark advance
    pub fn add_bookmark(&mut self) {
        self.bookmarks_advanced += 1;
    }

    /// Record a failed resource partition
    pub fn add_failure(&mut self, failure: impl Into<String>) {
        self.failures.push(failure.into());
    }

    /// Fold another set of stats into this one
    pub fn merge(&mut self, other: &SyncStats) {
        self.records_synced += other.records_synced;
        self.pages_fetched += other.pages_fetched;
        self.partitions_synced += other.partitions_synced;
        self.bookmarks_advanced += other.bookmarks_advanced;
        self.failures.extend(other.failures.iter().cloned());
    }
}
