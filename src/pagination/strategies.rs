//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{NextPage, PageToken, PaginationState, Paginator};
use crate::decode::lookup;
use crate::resource::PaginationKind;
use serde_json::Value;

// ============================================================================
// Token Pagination
// ============================================================================

/// Continuation-token pagination
///
/// The response carries the token at `path`; it is sent back as `param`.
/// An absent or empty token ends the listing regardless of record count.
#[derive(Debug, Clone)]
pub struct TokenPaginator {
    /// JSONPath to the token in the response body
    pub path: String,
    /// Query parameter carrying the token
    pub param: String,
}

impl TokenPaginator {
    /// Create a new token paginator
    pub fn new(path: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            param: param.into(),
        }
    }
}

impl Paginator for TokenPaginator {
    fn request_params(&self, token: Option<&PageToken>) -> Vec<(String, String)> {
        token
            .map(|t| vec![(self.param.clone(), t.as_param())])
            .unwrap_or_default()
    }

    fn next(&self, body: &Value, state: &mut PaginationState) -> NextPage {
        let token = match lookup(body, &self.path) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                state.mark_done();
                return NextPage::Done;
            }
        };
        NextPage::Continue(PageToken::Continuation(token))
    }
}

// ============================================================================
// Bounded Cursor Pagination
// ============================================================================

/// Reverse-chronological pagination over a time window
///
/// Every request carries `startTime=<since>` and `endTime=<cursor>`, where
/// the first cursor is the signpost (the instant the sync started). The
/// response's token is the next upper bound; paging continues only while it
/// is at or above `since`.
#[derive(Debug, Clone)]
pub struct BoundedCursorPaginator {
    /// JSONPath to the next cursor (epoch seconds)
    pub path: String,
    /// Lower bound, epoch seconds
    pub since: i64,
    /// Upper bound of the first page, epoch seconds
    pub signpost: i64,
}

impl BoundedCursorPaginator {
    /// Query parameter carrying the lower bound
    pub const START_PARAM: &'static str = "startTime";
    /// Query parameter carrying the upper bound
    pub const END_PARAM: &'static str = "endTime";

    /// Create a new bounded cursor paginator
    pub fn new(path: impl Into<String>, since: i64, signpost: i64) -> Self {
        Self {
            path: path.into(),
            since,
            signpost,
        }
    }
}

/// Whole epoch seconds; fractional cursors are truncated
#[allow(clippy::cast_possible_truncation)]
fn as_epoch(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Paginator for BoundedCursorPaginator {
    fn initial(&self) -> Option<PageToken> {
        Some(PageToken::Cursor(self.signpost))
    }

    fn request_params(&self, token: Option<&PageToken>) -> Vec<(String, String)> {
        let until = match token {
            Some(PageToken::Cursor(cursor)) => cursor.to_string(),
            Some(PageToken::Continuation(raw)) => raw.clone(),
            None => self.signpost.to_string(),
        };
        vec![
            (Self::START_PARAM.to_string(), self.since.to_string()),
            (Self::END_PARAM.to_string(), until),
        ]
    }

    fn next(&self, body: &Value, state: &mut PaginationState) -> NextPage {
        match lookup(body, &self.path).and_then(as_epoch) {
            Some(cursor) if cursor >= self.since => NextPage::Continue(PageToken::Cursor(cursor)),
            _ => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// Single request, no pagination
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl NoPaginator {
    /// Create a new no-op paginator
    pub fn new() -> Self {
        Self
    }
}

impl Paginator for NoPaginator {
    fn request_params(&self, _token: Option<&PageToken>) -> Vec<(String, String)> {
        Vec::new()
    }

    fn next(&self, _body: &Value, state: &mut PaginationState) -> NextPage {
        state.mark_done();
        NextPage::Done
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Build the paginator a resource asks for
///
/// `since` and `signpost` (epoch seconds) only matter for bounded cursors.
pub fn build_paginator(kind: &PaginationKind, since: i64, signpost: i64) -> Box<dyn Paginator> {
    match kind {
        PaginationKind::Token { path, param } => Box::new(TokenPaginator::new(path, param)),
        PaginationKind::BoundedCursor { path } => {
            Box::new(BoundedCursorPaginator::new(path, since, signpost))
        }
        PaginationKind::None => Box::new(NoPaginator::new()),
    }
}
