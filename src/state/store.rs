//! Bookmark store seam
//!
//! The stream engine reads a partition's bookmark once before its first
//! request and advances it once after the partition completes.

use super::types::{Bookmark, State};
use crate::error::Result;
use crate::partition::Context;
use async_trait::async_trait;

/// Per (stream, context) bookmark storage
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Current bookmark of a partition
    async fn get_bookmark(&self, stream: &str, context: &Context) -> Option<Bookmark>;

    /// Move a partition's bookmark forward
    ///
    /// Never regresses: a value at or below the stored one is ignored.
    /// Returns whether the stored bookmark changed.
    async fn advance_bookmark(
        &self,
        stream: &str,
        context: &Context,
        bookmark: Bookmark,
    ) -> Result<bool>;

    /// Copy of the full state
    async fn snapshot(&self) -> State;
}
