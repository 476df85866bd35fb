//! Resource definitions and the resource catalog
//!
//! Resources are declarative: endpoint template, keys, extraction path,
//! paging strategy and post-processing rules. Field schemas are not modeled.

mod catalog;
mod types;

pub use catalog::Catalog;
pub use types::{
    FlattenRule, PaginationKind, ResourceDefinition, CONTINUATION_TOKEN_PARAM,
    CONTINUATION_TOKEN_PATH, DEFAULT_PAGE_SIZE, DEFAULT_RECORDS_PATH,
};

#[cfg(test)]
mod tests;
