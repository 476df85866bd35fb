//! Decoder traits
//!
//! Defines the core decoder abstraction used by the stream engine.

use crate::error::Result;
use serde_json::Value;

/// Trait for decoding response bodies into record nodes
pub trait RecordDecoder: Send + Sync {
    /// Parse the response body into a single JSON value (full response)
    fn decode_raw(&self, body: &str) -> Result<Value>;

    /// Select record nodes from an already parsed body
    fn extract(&self, value: &Value) -> Result<Vec<Value>>;

    /// Parse the body and select its record nodes
    fn decode(&self, body: &str) -> Result<Vec<Value>> {
        let value = self.decode_raw(body)?;
        self.extract(&value)
    }
}
