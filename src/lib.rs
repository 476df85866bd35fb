// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-pulumi-cloud
//!
//! A Singer tap extracting organization data from the Pulumi Cloud API.
//!
//! ## Features
//!
//! - **Data-driven resources**: every endpoint is a descriptor in an embedded YAML catalog
//! - **Parent/child streams**: child contexts derived from parent records
//! - **Two pagination styles**: continuation tokens, and time-bounded cursors for audit logs
//! - **Incremental sync**: per-partition bookmarks that never move backwards
//! - **Singer output**: RECORD and STATE messages as JSON lines on stdout
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tap_pulumi_cloud::{config::TapConfig, state::StateManager, tap::Tap, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let tap = Tap::new(&config, Arc::new(StateManager::in_memory()))?;
//!
//!     let plan = tap.plan(None)?;
//!     let mut messages = Vec::new();
//!     tap.sync(&plan, &mut messages).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Tap                                    │
//! │  discover() -> DiscoveredCatalog    sync(plan) -> RECORD/STATE  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │ Resource │   HTTP    │   Paginate    │ Partition │   State     │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Catalog  │ Retry     │ Token         │ Org       │ Bookmarks   │
//! │ YAML     │ Rate Limit│ Bounded cursor│ Parent    │ State file  │
//! │          │ Cache     │ None          │ records   │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client with retry, rate limiting and caching
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Fetch contexts and partitioning
pub mod partition;

/// Record extraction from response bodies
pub mod decode;

/// Bookmarks and the state file
pub mod state;

/// Main execution engine
pub mod engine;

/// Tap configuration
pub mod config;

/// Resource descriptors and the built-in catalog
pub mod resource;

/// Template interpolation
pub mod template;

/// Record post-processing
pub mod transform;

/// Discovery and sync orchestration
pub mod tap;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::TapConfig;
pub use tap::Tap;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
