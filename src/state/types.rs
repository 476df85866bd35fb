//! State types for tracking sync progress
//!
//! Serialized in the Singer layout and persisted between runs:
//!
//! ```json
//! {"bookmarks": {"audit_logs": {"partitions": [
//!   {"context": {"org_name": "acme"},
//!    "replication_key": "timestamp",
//!    "replication_key_value": "2024-01-01T00:00:00Z"}
//! ]}}}
//! ```

use crate::partition::Context;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Complete tap state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: BTreeMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.bookmarks.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.bookmarks.entry(stream.to_string()).or_default()
    }

    /// Bookmark for one (stream, context)
    pub fn bookmark(&self, stream: &str, context: &Context) -> Option<Bookmark> {
        self.get_stream(stream)?.get_partition(context)?.bookmark()
    }
}

/// State for a single stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    /// Per-context bookmarks
    #[serde(default)]
    pub partitions: Vec<PartitionState>,
}

impl StreamState {
    /// Create a new empty stream state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get partition state
    pub fn get_partition(&self, context: &Context) -> Option<&PartitionState> {
        self.partitions.iter().find(|p| &p.context == context)
    }

    /// Get mutable partition state, creating if needed
    pub fn get_partition_mut(&mut self, context: &Context) -> &mut PartitionState {
        let index = match self.partitions.iter().position(|p| &p.context == context) {
            Some(index) => index,
            None => {
                self.partitions.push(PartitionState::new(context.clone()));
                self.partitions.len() - 1
            }
        };
        &mut self.partitions[index]
    }
}

/// Bookmark of a single (stream, context) partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionState {
    /// Fetch context this bookmark belongs to
    #[serde(default)]
    pub context: Context,

    /// Field the bookmark tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    /// Highest replicated value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<Value>,
}

impl PartitionState {
    /// Create an empty partition state
    pub fn new(context: Context) -> Self {
        Self {
            context,
            replication_key: None,
            replication_key_value: None,
        }
    }

    /// The stored bookmark, if both key and value are present
    pub fn bookmark(&self) -> Option<Bookmark> {
        Some(Bookmark {
            replication_key: self.replication_key.clone()?,
            value: self.replication_key_value.clone()?,
        })
    }
}

/// Replication position of one partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Field the value was taken from
    pub replication_key: String,
    /// Highest value seen
    pub value: Value,
}

impl Bookmark {
    /// Create a bookmark
    pub fn new(replication_key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            replication_key: replication_key.into(),
            value: value.into(),
        }
    }
}

fn as_datetime(value: &Value) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.as_str()?).ok()
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Order two replication values
///
/// Compared as datetimes when both parse as RFC 3339, then as numbers, and
/// finally by their string form.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (as_datetime(a), as_datetime(b)) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    crate::template::value_to_string(a).cmp(&crate::template::value_to_string(b))
}
