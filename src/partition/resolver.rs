//! Partition and context resolution
//!
//! Expands a resource into its fetch contexts: one per organization for
//! organization-partitioned resources, one per parent record for children.

use super::types::{Context, PartitionScheme};
use crate::error::{Error, Result};
use crate::resource::ResourceDefinition;
use crate::types::Record;
use std::collections::BTreeMap;

/// Context key carrying the organization name
pub const ORG_NAME_KEY: &str = "org_name";

/// Resolves fetch contexts for resources
#[derive(Debug, Clone, Default)]
pub struct ContextResolver {
    /// Organizations from the tap configuration, in configured order
    organizations: Vec<String>,
}

impl ContextResolver {
    /// Create a resolver for the configured organizations
    pub fn new(organizations: Vec<String>) -> Self {
        Self { organizations }
    }

    /// Configured organizations
    pub fn organizations(&self) -> &[String] {
        &self.organizations
    }

    /// Contexts for a top-level resource
    ///
    /// Child resources have no partitions of their own; calling this for one
    /// is an error since their contexts only exist once a parent record does.
    pub fn partitions(&self, resource: &ResourceDefinition) -> Result<Vec<Context>> {
        if let Some(parent) = &resource.parent {
            return Err(Error::partition(
                &resource.name,
                format!("child of '{parent}' is partitioned by parent records"),
            ));
        }

        Ok(match resource.partition {
            PartitionScheme::None => vec![Context::new()],
            PartitionScheme::Organization => self
                .organizations
                .iter()
                .map(|org| Context::new().with(ORG_NAME_KEY, org.as_str()))
                .collect(),
        })
    }
}

/// Build the context a child resource receives from one parent record
///
/// The parent's own context is carried forward so multi-level chains
/// accumulate keys; `mapping` (child key → parent record field) then adds or
/// overrides keys from the record.
pub fn child_context(
    parent: &ResourceDefinition,
    parent_context: &Context,
    record: &Record,
    mapping: &BTreeMap<String, String>,
) -> Result<Context> {
    let mut context = parent_context.clone();

    for (target, source) in mapping {
        let value = record.get(source).filter(|v| !v.is_null()).ok_or_else(|| {
            Error::partition(
                &parent.name,
                format!("record has no field '{source}' for child context key '{target}'"),
            )
        })?;
        context.insert(target.clone(), value.clone());
    }

    Ok(context)
}
