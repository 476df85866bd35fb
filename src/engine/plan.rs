//! Stream selection
//!
//! Selected streams emit records. Their ancestors must still be fetched to
//! produce child contexts, so they run in context-only mode.

use crate::error::Result;
use crate::resource::{Catalog, ResourceDefinition};
use std::collections::BTreeSet;

/// Which resources run, and which of them emit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    selected: BTreeSet<String>,
    needed: BTreeSet<String>,
}

impl SyncPlan {
    /// Select every resource in the catalog
    pub fn all(catalog: &Catalog) -> Self {
        let selected: BTreeSet<String> =
            catalog.resources().iter().map(|r| r.name.clone()).collect();
        Self {
            needed: selected.clone(),
            selected,
        }
    }

    /// Select the named streams; unknown names are an error
    pub fn for_streams<S: AsRef<str>>(catalog: &Catalog, streams: &[S]) -> Result<Self> {
        let mut selected = BTreeSet::new();
        let mut needed = BTreeSet::new();

        for name in streams {
            let resource = catalog.require(name.as_ref())?;
            selected.insert(resource.name.clone());
            needed.insert(resource.name.clone());
            for ancestor in catalog.ancestors(&resource.name) {
                needed.insert(ancestor.name.clone());
            }
        }

        Ok(Self { selected, needed })
    }

    /// Whether a stream emits records
    pub fn is_selected(&self, stream: &str) -> bool {
        self.selected.contains(stream)
    }

    /// Whether a stream is fetched at all
    pub fn is_needed(&self, stream: &str) -> bool {
        self.needed.contains(stream)
    }

    /// Selected stream names
    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    /// Top-level resources that have to run, in catalog order
    pub fn roots<'a>(&'a self, catalog: &'a Catalog) -> impl Iterator<Item = &'a ResourceDefinition> {
        catalog.top_level().filter(move |r| self.is_needed(&r.name))
    }
}
