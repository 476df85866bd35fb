//! Partition types
//!
//! A [`Context`] parameterizes one fetch of a resource. Top-level resources
//! get one context per partition (e.g. per organization); child resources get
//! one per emitted parent record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How a top-level resource is split into fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionScheme {
    /// A single fetch with an empty context
    #[default]
    None,
    /// One fetch per configured organization, keyed `org_name`
    Organization,
}

/// Placeholder name → value mapping for one fetch
///
/// Keys are kept sorted so equal contexts serialize and compare identically,
/// which is what keys bookmarks in the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Insert a value, replacing any previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a string value by key
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Whether the context carries no keys
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterate over keys and values in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Stable identifier, e.g. `org_name=acme/team_name=core`
    pub fn id(&self) -> String {
        if self.values.is_empty() {
            return "default".to_string();
        }
        self.values
            .iter()
            .map(|(k, v)| format!("{k}={}", crate::template::value_to_string(v)))
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
