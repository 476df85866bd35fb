//! Execution engine module
//!
//! Main read loop and resource tree traversal.
//!
//! # Overview
//!
//! The engine module provides:
//! - `StreamEngine` - the request, parse, paginate loop shared by every resource
//! - `SyncPlan` - which resources run and which of them emit
//! - Message types for output (Record, State)
//!
//! Pages are fetched strictly in sequence. Child resources of a record are
//! synced right after that record is emitted, before the next one.

mod plan;
mod types;

pub use plan::SyncPlan;
pub use types::{EngineConfig, Message, MessageSink, SyncStats};

use crate::decode::{JsonDecoder, RecordDecoder};
use crate::error::{Error, Result};
use crate::http::{build_url, send_with_retry, ErrorClassifier, HttpRequest, Outcome, Transport};
use crate::pagination::{build_paginator, NextPage, PageToken, PaginationState, Paginator};
use crate::partition::{child_context, Context};
use crate::resource::{Catalog, ResourceDefinition};
use crate::state::{compare_values, Bookmark, BookmarkStore};
use crate::template;
use crate::transform;
use crate::types::Record;
use chrono::{DateTime, SecondsFormat};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt, TryStreamExt};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::atomic::{self, AtomicUsize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Replication lower bound when neither a bookmark nor a start date exists
pub const EPOCH_START: &str = "1970-01-01T00:00:00Z";

/// Query parameter carrying the page size hint
pub const PAGE_SIZE_PARAM: &str = "pageSize";

/// Generic stream engine driven by resource definitions
pub struct StreamEngine {
    transport: Arc<dyn Transport>,
    state: Arc<dyn BookmarkStore>,
    config: EngineConfig,
    pages: AtomicUsize,
}

/// Per-partition pagination loop state
struct PageLoop {
    paginator: Box<dyn Paginator>,
    decoder: JsonDecoder,
    classifier: ErrorClassifier,
    token: Option<PageToken>,
    pagination: PaginationState,
    lower_bound: Option<Value>,
    finished: bool,
}

impl StreamEngine {
    /// Create a new stream engine
    pub fn new(
        transport: Arc<dyn Transport>,
        state: Arc<dyn BookmarkStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            transport,
            state,
            config,
            pages: AtomicUsize::new(0),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The bookmark store
    pub fn bookmarks(&self) -> &Arc<dyn BookmarkStore> {
        &self.state
    }

    /// Pages fetched since the engine was created
    pub fn pages_fetched(&self) -> usize {
        self.pages.load(atomic::Ordering::Relaxed)
    }

    /// Exclusive lower bound for an incremental resource
    ///
    /// The bookmark if present, else the configured start date, else the Unix
    /// epoch. Full-table resources have none.
    pub fn lower_bound(
        &self,
        resource: &ResourceDefinition,
        starting: Option<&Bookmark>,
    ) -> Option<Value> {
        resource.replication_key.as_ref()?;

        Some(match (starting, self.config.start_date) {
            (Some(bookmark), _) => bookmark.value.clone(),
            (None, Some(start)) => Value::String(start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            (None, None) => Value::String(EPOCH_START.to_string()),
        })
    }

    /// Lazily fetch every record of one (resource, context) partition
    ///
    /// Each call starts a fresh pagination loop; nothing is requested until
    /// the stream is polled.
    pub fn fetch_partition<'a>(
        &'a self,
        resource: &'a ResourceDefinition,
        context: &'a Context,
        starting: Option<Bookmark>,
    ) -> BoxStream<'a, Result<Record>> {
        let lower_bound = self.lower_bound(resource, starting.as_ref());
        let since = lower_bound.as_ref().and_then(epoch_seconds).unwrap_or(0);
        let paginator = build_paginator(
            &resource.pagination,
            since,
            self.config.signpost.timestamp(),
        );

        let page_loop = PageLoop {
            token: paginator.initial(),
            paginator,
            decoder: JsonDecoder::with_path(&resource.records_path),
            classifier: ErrorClassifier::new(resource.tolerated_statuses.clone())
                .with_retry_statuses(self.config.retry_statuses.clone()),
            pagination: PaginationState::new(),
            lower_bound,
            finished: false,
        };

        stream::try_unfold(page_loop, move |page_loop| self.step(resource, context, page_loop))
            .map_ok(|records| stream::iter(records.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }

    async fn step(
        &self,
        resource: &ResourceDefinition,
        context: &Context,
        mut page_loop: PageLoop,
    ) -> Result<Option<(Vec<Record>, PageLoop)>> {
        if page_loop.finished {
            return Ok(None);
        }
        let records = self.fetch_page(resource, context, &mut page_loop).await?;
        Ok(Some((records, page_loop)))
    }

    async fn fetch_page(
        &self,
        resource: &ResourceDefinition,
        context: &Context,
        page_loop: &mut PageLoop,
    ) -> Result<Vec<Record>> {
        let mut params = Vec::new();
        for (key, value) in &resource.params {
            params.push((key.clone(), template::render(value, context)?));
        }
        if let Some(size) = resource.page_size {
            params.push((PAGE_SIZE_PARAM.to_string(), size.to_string()));
        }
        params.extend(page_loop.paginator.request_params(page_loop.token.as_ref()));

        let path = template::render_path(&resource.path, context)?;
        let url = build_url(&self.config.base_url, &path, &params)?;
        let request = HttpRequest::get(url.as_str());

        let outcome = send_with_retry(
            self.transport.as_ref(),
            &request,
            &page_loop.classifier,
            &self.config.retry,
            &resource.name,
        )
        .await?;

        let response = match outcome {
            Outcome::Success(response) => response,
            Outcome::Tolerated(_) => {
                page_loop.finished = true;
                return Ok(Vec::new());
            }
        };
        self.pages.fetch_add(1, atomic::Ordering::Relaxed);

        let malformed = |message: String| Error::malformed_page(&resource.name, url.as_str(), message);
        let body = page_loop
            .decoder
            .decode_raw(&response.body)
            .map_err(|e| malformed(e.to_string()))?;
        let nodes = page_loop
            .decoder
            .extract(&body)
            .map_err(|e| malformed(e.to_string()))?;

        page_loop.pagination.add_page(nodes.len());
        if nodes.is_empty() {
            info!(
                "Pagination of '{}' [{}] stopped after {} page(s): no records in the last response",
                resource.name,
                context.id(),
                page_loop.pagination.pages
            );
            page_loop.finished = true;
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(nodes.len());
        for node in nodes {
            let raw = match node {
                Value::Object(map) => map,
                other => {
                    return Err(malformed(format!(
                        "expected objects at '{}', found {}",
                        resource.records_path,
                        json_kind(&other)
                    )));
                }
            };
            let record = transform::post_process(resource, raw, context);
            if above_lower_bound(resource, &record, page_loop.lower_bound.as_ref()) {
                records.push(record);
            }
        }

        debug!(
            "Page {} of '{}' [{}]: {} record(s) kept",
            page_loop.pagination.pages,
            resource.name,
            context.id(),
            records.len()
        );

        match page_loop.paginator.next(&body, &mut page_loop.pagination) {
            NextPage::Continue(token) if page_loop.token.as_ref() == Some(&token) => {
                warn!(
                    "Stream '{}' returned the same page token twice, stopping",
                    resource.name
                );
                page_loop.finished = true;
            }
            NextPage::Continue(token) => page_loop.token = Some(token),
            NextPage::Done => page_loop.finished = true,
        }

        Ok(records)
    }

    /// Sync one resource in one context, then its children per record
    ///
    /// Records are emitted only for selected resources; unselected ancestors
    /// are fetched for their child contexts alone. An error in this resource's
    /// own partition is returned. A failed child partition is logged and
    /// recorded in `stats.failures` while its siblings and the remaining
    /// parent records carry on.
    pub fn sync_tree<'a, 's: 'a>(
        &'a self,
        catalog: &'a Catalog,
        resource: &'a ResourceDefinition,
        context: Context,
        plan: &'a SyncPlan,
        sink: &'a mut (dyn MessageSink + 's),
        stats: &'a mut SyncStats,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let emit = plan.is_selected(&resource.name);
            let children: Vec<&ResourceDefinition> = catalog
                .children(&resource.name)
                .filter(|c| plan.is_needed(&c.name))
                .collect();

            let starting = if resource.is_incremental() {
                self.state.get_bookmark(&resource.name, &context).await
            } else {
                None
            };

            info!(
                "Syncing '{}' [{}]{}",
                resource.name,
                context.id(),
                if emit { "" } else { " for child contexts only" }
            );

            let mut max_value: Option<Value> = None;
            let mut emitted = 0usize;
            let mut records = self.fetch_partition(resource, &context, starting);

            while let Some(record) = records.try_next().await? {
                if let Some(value) = resource
                    .replication_key
                    .as_ref()
                    .and_then(|key| record.get(key))
                    .filter(|v| !v.is_null())
                {
                    let larger = max_value
                        .as_ref()
                        .map_or(true, |m| compare_values(value, m) == Ordering::Greater);
                    if larger {
                        max_value = Some(value.clone());
                    }
                }

                let child_ctx = if children.is_empty() {
                    None
                } else {
                    Some(child_context(resource, &context, &record, &resource.child_context)?)
                };

                if emit {
                    sink.emit(Message::record(resource.name.clone(), record))?;
                    emitted += 1;
                }

                if let Some(child_ctx) = child_ctx {
                    for child in &children {
                        let result = self
                            .sync_tree(catalog, child, child_ctx.clone(), plan, &mut *sink, &mut *stats)
                            .await;
                        if let Err(e) = result {
                            let label = partition_label(child, &child_ctx);
                            error!("Sync of {} failed: {}", label, e);
                            stats.add_failure(format!("{label}: {e}"));
                        }
                    }
                }
            }
            drop(records);

            stats.add_records(emitted);
            stats.add_partition();
            debug!(
                "Finished '{}' [{}]: {} record(s) emitted",
                resource.name,
                context.id(),
                emitted
            );

            if let (true, Some(key), Some(value)) = (emit, &resource.replication_key, max_value) {
                let signpost = self.config.signpost_value();
                let value = if compare_values(&value, &signpost) == Ordering::Greater {
                    signpost
                } else {
                    value
                };

                let advanced = self
                    .state
                    .advance_bookmark(&resource.name, &context, Bookmark::new(key.clone(), value))
                    .await?;
                if advanced {
                    stats.add_bookmark();
                    let snapshot = self.state.snapshot().await;
                    sink.emit(Message::state(serde_json::to_value(&snapshot)?))?;
                }
            }

            Ok(())
        }
        .boxed()
    }
}

impl std::fmt::Debug for StreamEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEngine")
            .field("config", &self.config)
            .field("pages_fetched", &self.pages_fetched())
            .finish_non_exhaustive()
    }
}

/// `name [org_name=acme/...]`, or the bare name for an empty context
pub fn partition_label(resource: &ResourceDefinition, context: &Context) -> String {
    if context.is_empty() {
        resource.name.clone()
    } else {
        format!("{} [{}]", resource.name, context.id())
    }
}

/// Keep records strictly above the lower bound; records without a
/// replication value are kept
fn above_lower_bound(
    resource: &ResourceDefinition,
    record: &Record,
    lower_bound: Option<&Value>,
) -> bool {
    let (Some(key), Some(bound)) = (&resource.replication_key, lower_bound) else {
        return true;
    };
    match record.get(key) {
        Some(value) if !value.is_null() => compare_values(value, bound) == Ordering::Greater,
        _ => true,
    }
}

/// Epoch seconds of an RFC 3339 or numeric replication value
#[allow(clippy::cast_possible_truncation)]
fn epoch_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp())
            .ok()
            .or_else(|| s.trim().parse().ok()),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
