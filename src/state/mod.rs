//! State management module
//!
//! Handles bookmark tracking and persistence between sync runs.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Singer-style bookmarks per stream and context
//! - `BookmarkStore` - the seam the stream engine reads and advances
//! - `StateManager` - file-backed store with atomic writes

mod manager;
mod store;
mod types;

pub use manager::StateManager;
pub use store::BookmarkStore;
pub use types::{compare_values, Bookmark, PartitionState, State, StreamState};
