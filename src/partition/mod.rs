//! Partition routing module
//!
//! Supports: per-organization partitions and parent-record contexts
//!
//! # Overview
//!
//! Every fetch of a resource is parameterized by a [`Context`]:
//! - Top-level resources partitioned by organization fetch once per
//!   configured organization (`{org_name}`)
//! - Child resources fetch once per parent record, with a context built
//!   from the parent's context plus named fields of the record

mod resolver;
mod types;

pub use resolver::{child_context, ContextResolver, ORG_NAME_KEY};
pub use types::{Context, PartitionScheme};

#[cfg(test)]
mod tests;
