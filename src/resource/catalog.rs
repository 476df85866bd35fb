//! Resource catalog
//!
//! The registry of resource definitions. The built-in Pulumi Cloud catalog is
//! embedded from `resources/pulumi_cloud.yaml`.

use super::types::{PaginationKind, ResourceDefinition};
use crate::error::{Error, Result};
use crate::partition::{PartitionScheme, ORG_NAME_KEY};
use crate::template;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Built-in resource definitions
static BUILTIN_CATALOG: &str = include_str!("../../resources/pulumi_cloud.yaml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    resources: Vec<ResourceDefinition>,
}

/// Validated set of resource definitions
///
/// Parents are always declared before their children, so iteration order is
/// a valid sync order.
#[derive(Debug, Clone)]
pub struct Catalog {
    resources: Vec<ResourceDefinition>,
}

impl Catalog {
    /// Build a catalog, validating parent links and placeholders
    pub fn new(resources: Vec<ResourceDefinition>) -> Result<Self> {
        validate(&resources)?;
        Ok(Self { resources })
    }

    /// The built-in Pulumi Cloud catalog
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    /// Parse a catalog from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse resource catalog: {e}")))?;
        Self::new(file.resources)
    }

    /// Drop enterprise resources (and everything below them) unless enabled
    #[must_use]
    pub fn with_enterprise(self, enabled: bool) -> Self {
        if enabled {
            return self;
        }

        let mut dropped: HashSet<String> = HashSet::new();
        let mut kept = Vec::with_capacity(self.resources.len());
        for resource in self.resources {
            let parent_dropped = resource
                .parent
                .as_ref()
                .is_some_and(|p| dropped.contains(p));
            if resource.enterprise || parent_dropped {
                dropped.insert(resource.name.clone());
            } else {
                kept.push(resource);
            }
        }

        Self { resources: kept }
    }

    /// All resources in declaration order
    pub fn resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Look up a resource by name
    pub fn get(&self, name: &str) -> Option<&ResourceDefinition> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Look up a resource by name, failing if absent
    pub fn require(&self, name: &str) -> Result<&ResourceDefinition> {
        self.get(name).ok_or_else(|| Error::StreamNotFound {
            stream: name.to_string(),
        })
    }

    /// Resources without a parent
    pub fn top_level(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.resources.iter().filter(|r| r.parent.is_none())
    }

    /// Direct children of a resource
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ResourceDefinition> {
        self.resources
            .iter()
            .filter(move |r| r.parent.as_deref() == Some(name))
    }

    /// Ancestors of a resource, nearest first
    pub fn ancestors(&self, name: &str) -> Vec<&ResourceDefinition> {
        let mut chain = Vec::new();
        let mut current = self.get(name).and_then(|r| r.parent.as_deref());
        while let Some(parent_name) = current {
            match self.get(parent_name) {
                Some(parent) => {
                    current = parent.parent.as_deref();
                    chain.push(parent);
                }
                None => break,
            }
        }
        chain
    }
}

/// Keys available to a resource's templates: its partition keys plus
/// everything its ancestors put in the context.
fn available_keys(
    resource: &ResourceDefinition,
    by_name: &HashMap<&str, &ResourceDefinition>,
    cache: &mut HashMap<String, BTreeSet<String>>,
) -> BTreeSet<String> {
    if let Some(keys) = cache.get(&resource.name) {
        return keys.clone();
    }

    let keys = match resource.parent.as_deref().and_then(|p| by_name.get(p)) {
        Some(parent) => {
            let mut keys = available_keys(parent, by_name, cache);
            keys.extend(parent.child_context.keys().cloned());
            keys
        }
        None => match resource.partition {
            PartitionScheme::Organization => BTreeSet::from([ORG_NAME_KEY.to_string()]),
            PartitionScheme::None => BTreeSet::new(),
        },
    };

    cache.insert(resource.name.clone(), keys.clone());
    keys
}

fn validate(resources: &[ResourceDefinition]) -> Result<()> {
    let mut by_name: HashMap<&str, &ResourceDefinition> = HashMap::new();

    for resource in resources {
        if resource.name.is_empty() {
            return Err(Error::config("Resource name cannot be empty"));
        }
        if by_name.contains_key(resource.name.as_str()) {
            return Err(Error::invalid_resource(&resource.name, "duplicate name"));
        }
        if let Some(parent) = &resource.parent {
            // Declared-before-use also rules out cycles
            if !by_name.contains_key(parent.as_str()) {
                return Err(Error::invalid_resource(
                    &resource.name,
                    format!("parent '{parent}' must be declared before its children"),
                ));
            }
            if resource.partition != PartitionScheme::None {
                return Err(Error::invalid_resource(
                    &resource.name,
                    "child resources are partitioned by their parent",
                ));
            }
        }
        if matches!(resource.pagination, PaginationKind::BoundedCursor { .. })
            && resource.replication_key.is_none()
        {
            return Err(Error::invalid_resource(
                &resource.name,
                "bounded cursor pagination requires a replication key",
            ));
        }
        by_name.insert(resource.name.as_str(), resource);
    }

    let mut cache = HashMap::new();
    for resource in resources {
        let keys = available_keys(resource, &by_name, &mut cache);
        let templates = std::iter::once(resource.path.as_str())
            .chain(resource.params.values().map(String::as_str));
        for text in templates {
            for variable in template::extract_variables(text) {
                if !keys.contains(&variable) {
                    return Err(Error::invalid_resource(
                        &resource.name,
                        format!("placeholder '{{{variable}}}' is never provided"),
                    ));
                }
            }
        }
    }

    Ok(())
}
