//! Response classification
//!
//! Decides what a status code means for a resource, in this order:
//! tolerated, retriable, fatal, success.

/// Outcome class of one HTTP attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Usable response
    Success,
    /// Expected failure treated as an empty page
    Tolerated,
    /// Transient failure; back off and try again
    Retriable,
    /// Permanent failure
    Fatal,
}

/// Per-resource status classifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorClassifier {
    /// Statuses treated as an empty result, checked first
    tolerated: Vec<u16>,
    /// Extra statuses to retry besides 5xx and 429
    retry_statuses: Vec<u16>,
}

impl ErrorClassifier {
    /// Create a classifier with a tolerated allow-list
    pub fn new(tolerated: impl Into<Vec<u16>>) -> Self {
        Self {
            tolerated: tolerated.into(),
            retry_statuses: Vec::new(),
        }
    }

    /// Also retry these statuses
    #[must_use]
    pub fn with_retry_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retry_statuses = statuses.into();
        self
    }

    /// Classify a status code
    pub fn classify(&self, status: u16) -> ResponseClass {
        if self.tolerated.contains(&status) {
            ResponseClass::Tolerated
        } else if (500..600).contains(&status)
            || status == 429
            || self.retry_statuses.contains(&status)
        {
            ResponseClass::Retriable
        } else if (400..500).contains(&status) {
            ResponseClass::Fatal
        } else {
            ResponseClass::Success
        }
    }
}
