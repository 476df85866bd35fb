//! Resource descriptor types
//!
//! A [`ResourceDefinition`] is the static, data-driven description of one
//! Pulumi Cloud endpoint. The stream engine is generic over it.

use crate::partition::PartitionScheme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSONPath of the continuation token in every paginated response
pub const CONTINUATION_TOKEN_PATH: &str = "$.continuationToken";

/// Query parameter carrying the continuation token
pub const CONTINUATION_TOKEN_PARAM: &str = "continuationToken";

/// Default record extraction path
pub const DEFAULT_RECORDS_PATH: &str = "$[*]";

/// Default page size hint
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Paging strategy selected by a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationKind {
    /// Continuation token read from the body and echoed back as a parameter
    Token {
        /// JSONPath to the token
        #[serde(default = "default_token_path")]
        path: String,
        /// Query parameter name for the token
        #[serde(default = "default_token_param")]
        param: String,
    },
    /// Reverse-chronological walk bounded below by the sync start time
    BoundedCursor {
        /// JSONPath to the next upper bound (epoch seconds)
        #[serde(default = "default_token_path")]
        path: String,
    },
    /// Single request
    None,
}

impl Default for PaginationKind {
    fn default() -> Self {
        Self::Token {
            path: default_token_path(),
            param: default_token_param(),
        }
    }
}

fn default_token_path() -> String {
    CONTINUATION_TOKEN_PATH.to_string()
}

fn default_token_param() -> String {
    CONTINUATION_TOKEN_PARAM.to_string()
}

/// Promote the keys of a nested object to prefixed top-level fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlattenRule {
    /// Field holding the nested object (after key normalization)
    pub field: String,
    /// Prefix for promoted keys; defaults to `<field>_`
    #[serde(default)]
    pub prefix: Option<String>,
}

impl FlattenRule {
    /// Create a rule with the default prefix
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            prefix: None,
        }
    }

    /// Prefix applied to promoted keys
    pub fn prefix(&self) -> String {
        self.prefix
            .clone()
            .unwrap_or_else(|| format!("{}_", self.field))
    }
}

/// Static descriptor of one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDefinition {
    /// Stream name
    pub name: String,
    /// Endpoint path template, e.g. `/api/orgs/{org_name}/teams`
    pub path: String,
    /// Fields forming the primary key, in order
    #[serde(default)]
    pub primary_keys: Vec<String>,
    /// JSONPath selecting records in the response body
    #[serde(default = "default_records_path")]
    pub records_path: String,
    /// Field used for incremental replication
    #[serde(default)]
    pub replication_key: Option<String>,
    /// Parent resource whose records produce this resource's contexts
    #[serde(default)]
    pub parent: Option<String>,
    /// Partition scheme (top-level resources only)
    #[serde(default)]
    pub partition: PartitionScheme,
    /// Paging strategy
    #[serde(default)]
    pub pagination: PaginationKind,
    /// Extra query parameters; values may contain placeholders
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Child context mapping: child key → field of this resource's records
    #[serde(default)]
    pub child_context: BTreeMap<String, String>,
    /// Nested objects promoted to prefixed top-level fields
    #[serde(default)]
    pub flatten: Vec<FlattenRule>,
    /// Fields converted from epoch seconds to ISO-8601
    #[serde(default)]
    pub datetime_fields: Vec<String>,
    /// Statuses treated as an empty result
    #[serde(default)]
    pub tolerated_statuses: Vec<u16>,
    /// Page size hint sent as `pageSize`
    #[serde(default = "default_page_size")]
    pub page_size: Option<u32>,
    /// Only registered when enterprise streams are enabled
    #[serde(default)]
    pub enterprise: bool,
}

fn default_records_path() -> String {
    DEFAULT_RECORDS_PATH.to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_page_size() -> Option<u32> {
    Some(DEFAULT_PAGE_SIZE)
}

impl ResourceDefinition {
    /// Create a resource with defaults for everything but name and path
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            primary_keys: Vec::new(),
            records_path: default_records_path(),
            replication_key: None,
            parent: None,
            partition: PartitionScheme::None,
            pagination: PaginationKind::default(),
            params: BTreeMap::new(),
            child_context: BTreeMap::new(),
            flatten: Vec::new(),
            datetime_fields: Vec::new(),
            tolerated_statuses: Vec::new(),
            page_size: default_page_size(),
            enterprise: false,
        }
    }

    /// Set the records path
    #[must_use]
    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = path.into();
        self
    }

    /// Set the primary keys
    #[must_use]
    pub fn with_primary_keys(mut self, keys: &[&str]) -> Self {
        self.primary_keys = keys.iter().map(ToString::to_string).collect();
        self
    }

    /// Partition by organization
    #[must_use]
    pub fn by_organization(mut self) -> Self {
        self.partition = PartitionScheme::Organization;
        self
    }

    /// Set the parent resource
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the replication key
    #[must_use]
    pub fn with_replication_key(mut self, key: impl Into<String>) -> Self {
        self.replication_key = Some(key.into());
        self
    }

    /// Set the pagination strategy
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationKind) -> Self {
        self.pagination = pagination;
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a child context mapping entry
    #[must_use]
    pub fn with_child_key(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.child_context.insert(target.into(), source.into());
        self
    }

    /// Add a flatten rule
    #[must_use]
    pub fn with_flatten(mut self, rule: FlattenRule) -> Self {
        self.flatten.push(rule);
        self
    }

    /// Declare a datetime field
    #[must_use]
    pub fn with_datetime_field(mut self, field: impl Into<String>) -> Self {
        self.datetime_fields.push(field.into());
        self
    }

    /// Tolerate a status code
    #[must_use]
    pub fn tolerating(mut self, status: u16) -> Self {
        self.tolerated_statuses.push(status);
        self
    }

    /// Set or clear the page size hint
    #[must_use]
    pub fn with_page_size(mut self, size: Option<u32>) -> Self {
        self.page_size = size;
        self
    }

    /// Whether this resource is fetched per parent record
    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    /// Whether this resource syncs incrementally
    pub fn is_incremental(&self) -> bool {
        self.replication_key.is_some()
    }
}
