//! Error types for tap-pulumi-cloud
//!
//! This module defines the error hierarchy for the entire tap.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Tolerated HTTP statuses never surface here: the classifier turns them
//! into an empty page before any error is built.

use thiserror::Error;

/// The main error type for tap-pulumi-cloud
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{status} {kind} Error: {reason} for path: {url} (stream '{stream}')")]
    FatalRequest {
        stream: String,
        url: String,
        status: u16,
        kind: &'static str,
        reason: String,
    },

    #[error("Giving up on {url} after {attempts} attempts (last status: {last_status})")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_status: String,
    },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Malformed page for stream '{stream}' at '{path}': {message}")]
    MalformedPage {
        stream: String,
        path: String,
        message: String,
    },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // Catalog / Sync Errors
    // ============================================================================
    #[error("Resource '{stream}' not found in catalog")]
    StreamNotFound { stream: String },

    #[error("Invalid resource definition '{stream}': {message}")]
    InvalidResource { stream: String, message: String },

    #[error("Partition error for stream '{stream}': {message}")]
    Partition { stream: String, message: String },

    #[error("Sync failed for {} resource(s): {}", .streams.len(), .streams.join("; "))]
    SyncFailed { streams: Vec<String> },

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a fatal request error from a rejected response
    pub fn fatal_request(
        stream: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        reason: impl Into<String>,
    ) -> Self {
        let kind = if (500..600).contains(&status) {
            "Server"
        } else {
            "Client"
        };
        Self::FatalRequest {
            stream: stream.into(),
            url: url.into(),
            status,
            kind,
            reason: reason.into(),
        }
    }

    /// Create a JSONPath error
    pub fn json_path(message: impl Into<String>) -> Self {
        Self::JsonPath {
            message: message.into(),
        }
    }

    /// Create a malformed page error
    pub fn malformed_page(
        stream: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedPage {
            stream: stream.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a partition error
    pub fn partition(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Partition {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create an invalid resource definition error
    pub fn invalid_resource(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResource {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Result type alias for tap-pulumi-cloud
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
