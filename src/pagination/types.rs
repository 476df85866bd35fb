//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use serde_json::Value;

/// Opaque position within a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageToken {
    /// Continuation token echoed back to the API
    Continuation(String),
    /// Upper time bound (epoch seconds) for the next page
    Cursor(i64),
}

impl PageToken {
    /// Render the token as a query parameter value
    pub fn as_param(&self) -> String {
        match self {
            Self::Continuation(token) => token.clone(),
            Self::Cursor(cursor) => cursor.to_string(),
        }
    }
}

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Another page exists at this token
    Continue(PageToken),
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    /// The token for the next page, if any
    pub fn token(&self) -> Option<&PageToken> {
        match self {
            Self::Continue(token) => Some(token),
            Self::Done => None,
        }
    }
}

/// Tracks pagination progress for one partition loop
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Pages fetched so far
    pub pages: u32,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fetched page
    pub fn add_page(&mut self, records: usize) {
        self.pages += 1;
        self.total_fetched += records as u64;
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Token for the first request (`None` requests the first page bare)
    fn initial(&self) -> Option<PageToken> {
        None
    }

    /// Query parameters contributed for a request at `token`
    fn request_params(&self, token: Option<&PageToken>) -> Vec<(String, String)>;

    /// Inspect a successful response and decide whether another page exists
    fn next(&self, body: &Value, state: &mut PaginationState) -> NextPage;
}
