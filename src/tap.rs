//! Tap orchestration
//!
//! Ties the catalog, context resolver and stream engine together: discovery
//! lists the registered streams, sync walks every needed top-level resource
//! for every one of its contexts.
//!
//! Each (top-level resource, context) tree runs independently, and inside a
//! tree each child partition fails on its own. The rest still run and the
//! failures are reported together at the end.

use crate::config::TapConfig;
use crate::engine::{
    partition_label, EngineConfig, Message, MessageSink, StreamEngine, SyncPlan, SyncStats,
};
use crate::error::{Error, Result};
use crate::http::{HttpClient, Transport};
use crate::partition::ContextResolver;
use crate::resource::{Catalog, ResourceDefinition};
use crate::state::BookmarkStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Singer replication method of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMethod {
    /// Bookmarked by a replication key
    Incremental,
    /// Re-read in full on every run
    FullTable,
}

/// One stream as reported by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredStream {
    pub tap_stream_id: String,
    pub stream: String,
    pub key_properties: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
    pub replication_method: ReplicationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_stream: Option<String>,
}

impl From<&ResourceDefinition> for DiscoveredStream {
    fn from(resource: &ResourceDefinition) -> Self {
        Self {
            tap_stream_id: resource.name.clone(),
            stream: resource.name.clone(),
            key_properties: resource.primary_keys.clone(),
            replication_key: resource.replication_key.clone(),
            replication_method: if resource.is_incremental() {
                ReplicationMethod::Incremental
            } else {
                ReplicationMethod::FullTable
            },
            parent_stream: resource.parent.clone(),
        }
    }
}

/// Discovery output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredCatalog {
    pub streams: Vec<DiscoveredStream>,
}

impl DiscoveredCatalog {
    /// Stream names in sync order
    pub fn names(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.stream.as_str()).collect()
    }
}

/// The Pulumi Cloud tap
pub struct Tap {
    catalog: Catalog,
    resolver: ContextResolver,
    engine: StreamEngine,
}

impl Tap {
    /// Build a tap talking to the Pulumi Cloud API
    pub fn new(config: &TapConfig, state: Arc<dyn BookmarkStore>) -> Result<Self> {
        let client = HttpClient::with_config(config.http_client_config())?;
        Self::with_parts(config, Arc::new(client), state, config.engine_config())
    }

    /// Build a tap from explicit parts
    pub fn with_parts(
        config: &TapConfig,
        transport: Arc<dyn Transport>,
        state: Arc<dyn BookmarkStore>,
        engine_config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let catalog = Catalog::builtin()?.with_enterprise(config.enterprise_streams);
        info!(
            "Registered {} stream(s) for {} organization(s)",
            catalog.len(),
            config.organizations.len()
        );

        Ok(Self {
            catalog,
            resolver: ContextResolver::new(config.organizations.clone()),
            engine: StreamEngine::new(transport, state, engine_config),
        })
    }

    /// Registered resources
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Describe every registered stream
    pub fn discover(&self) -> DiscoveredCatalog {
        DiscoveredCatalog {
            streams: self
                .catalog
                .resources()
                .iter()
                .map(DiscoveredStream::from)
                .collect(),
        }
    }

    /// Plan for the named streams, or for all of them
    pub fn plan(&self, streams: Option<&[String]>) -> Result<SyncPlan> {
        match streams {
            Some(names) if !names.is_empty() => SyncPlan::for_streams(&self.catalog, names),
            _ => Ok(SyncPlan::all(&self.catalog)),
        }
    }

    /// Run the plan, emitting records and state into `sink`
    ///
    /// A final STATE message carries the full bookmark snapshot. If any
    /// resource partition failed, top-level or child, the result is
    /// [`Error::SyncFailed`] naming each of them.
    pub async fn sync(&self, plan: &SyncPlan, sink: &mut dyn MessageSink) -> Result<SyncStats> {
        let mut stats = SyncStats::new();
        let pages_before = self.engine.pages_fetched();

        for resource in plan.roots(&self.catalog) {
            for context in self.resolver.partitions(resource)? {
                let label = partition_label(resource, &context);
                let result = self
                    .engine
                    .sync_tree(&self.catalog, resource, context, plan, &mut *sink, &mut stats)
                    .await;
                if let Err(e) = result {
                    error!("Sync of {} failed: {}", label, e);
                    stats.add_failure(format!("{label}: {e}"));
                }
            }
        }

        stats.add_pages(self.engine.pages_fetched() - pages_before);
        let snapshot = self.engine.bookmarks().snapshot().await;
        sink.emit(Message::state(serde_json::to_value(&snapshot)?))?;

        info!(
            "Sync finished: {} record(s), {} page(s), {} partition(s), {} failure(s)",
            stats.records_synced,
            stats.pages_fetched,
            stats.partitions_synced,
            stats.failures.len()
        );

        if stats.failures.is_empty() {
            Ok(stats)
        } else {
            Err(Error::SyncFailed {
                streams: stats.failures,
            })
        }
    }
}

impl std::fmt::Debug for Tap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tap")
            .field("streams", &self.catalog.len())
            .field("organizations", &self.resolver.organizations())
            .field("engine", &self.engine)
            .finish()
    }
}
