//! JSON decoder and path helpers

use super::types::RecordDecoder;
use crate::error::{Error, Result};
use serde_json::Value;

/// JSON decoder with record path extraction
#[derive(Debug, Clone)]
pub struct JsonDecoder {
    /// JSONPath selecting records
    record_path: String,
}

impl Default for JsonDecoder {
    fn default() -> Self {
        Self::with_path(crate::resource::DEFAULT_RECORDS_PATH)
    }
}

impl JsonDecoder {
    /// Create a decoder using the default `$[*]` path
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: path.into(),
        }
    }

    /// The configured record path
    pub fn record_path(&self) -> &str {
        &self.record_path
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode_raw(&self, body: &str) -> Result<Value> {
        Ok(serde_json::from_str(body)?)
    }

    fn extract(&self, value: &Value) -> Result<Vec<Value>> {
        let path = self.record_path.as_str();

        // `foo[*]` over an object body means the object itself is the record
        if let Some(prefix) = path.strip_suffix("[*]") {
            if !is_complex(prefix) {
                return Ok(match lookup(value, prefix) {
                    Some(Value::Array(items)) => items.clone(),
                    Some(Value::Null) | None => Vec::new(),
                    Some(other) => vec![other.clone()],
                });
            }
        }

        if is_complex(path) {
            return extract_with_jsonpath(value, path);
        }

        Ok(match lookup(value, path) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.clone()],
        })
    }
}

fn is_complex(path: &str) -> bool {
    path.contains('*') || path.contains("..") || path.contains('?')
}

/// Resolve a simple dotted path such as `$.continuationToken` or `$.items[0].id`
///
/// Returns `None` when any segment is missing.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        let (name, index) = match part.find('[') {
            Some(pos) => (&part[..pos], Some(part[pos + 1..].trim_end_matches(']'))),
            None => (part, None),
        };

        if !name.is_empty() {
            current = current.get(name)?;
        }

        if let Some(index) = index {
            let items = current.as_array()?;
            let index: i64 = index.parse().ok()?;
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_possible_wrap
            )]
            let idx = if index < 0 {
                (items.len() as i64 + index) as usize
            } else {
                index as usize
            };
            current = items.get(idx)?;
        }
    }

    Some(current)
}

/// Extract values using full JSONPath syntax
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path)
        .map_err(|e| Error::json_path(format!("Invalid JSONPath '{path}': {e}")))?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}
