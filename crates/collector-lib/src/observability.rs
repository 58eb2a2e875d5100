//! Observability infrastructure for the metrics collector
//!
//! Provides:
//! - Prometheus time series per tracked cluster (processing outcome, last
//!   processed timestamp, stale republish streak, fetched clusters, SKR
//!   queries) with cleanup of every series of a removed cluster
//! - Structured JSON logging with tracing

use crate::consumption::ConsumptionRecord;
use crate::models::ClusterIdentity;
use chrono::Utc;
use prometheus::core::{Collector, MetricVec, MetricVecBuilder};
use prometheus::{
    Encoder, GaugeVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

pub const NAMESPACE: &str = "kmc";
pub const PROCESS_SUBSYSTEM: &str = "process";
pub const SKR_SUBSYSTEM: &str = "skr";

const SHOOT_NAME_LABEL: &str = "shoot_name";
const INSTANCE_ID_LABEL: &str = "instance_id";
const RUNTIME_ID_LABEL: &str = "runtime_id";
const SUB_ACCOUNT_LABEL: &str = "sub_account_id";
const GLOBAL_ACCOUNT_LABEL: &str = "global_account_id";
const SUCCESS_LABEL: &str = "success";
const WITH_OLD_METRIC_LABEL: &str = "with_old_metric";
const TRACKABLE_LABEL: &str = "trackable";
const ACTION_LABEL: &str = "action";

const IDENTITY_LABELS: [&str; 5] = [
    SHOOT_NAME_LABEL,
    INSTANCE_ID_LABEL,
    RUNTIME_ID_LABEL,
    SUB_ACCOUNT_LABEL,
    GLOBAL_ACCOUNT_LABEL,
];

/// Kind of list call made against a cluster's API server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkrQueryAction {
    ListNodes,
    ListPvcs,
    ListServices,
}

impl SkrQueryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkrQueryAction::ListNodes => "list_nodes",
            SkrQueryAction::ListPvcs => "list_pvcs",
            SkrQueryAction::ListServices => "list_svcs",
        }
    }
}

fn bool_label(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Label names of a family: its own leading labels, then the identity
fn label_names(leading: &[&'static str]) -> Vec<&'static str> {
    leading.iter().chain(IDENTITY_LABELS.iter()).copied().collect()
}

/// Label values in declaration order: leading values, then the identity
fn label_values<'a>(leading: &[&'a str], identity: &'a ClusterIdentity) -> Vec<&'a str> {
    leading
        .iter()
        .copied()
        .chain(identity.label_values())
        .collect()
}

fn opts(subsystem: &str, name: &str, help: &str) -> Opts {
    Opts::new(name, help)
        .namespace(NAMESPACE)
        .subsystem(subsystem)
}

/// Remove every series of `vec` whose labels contain all of `matcher`,
/// whatever its other labels are. Returns the number of removed series.
fn delete_partial_match<T: MetricVecBuilder>(vec: &MetricVec<T>, matcher: &[(&str, &str)]) -> usize {
    let mut deleted = 0;
    for family in vec.collect() {
        for metric in family.get_metric() {
            let labels: HashMap<&str, &str> = metric
                .get_label()
                .iter()
                .map(|pair| (pair.get_name(), pair.get_value()))
                .collect();

            let matches = matcher
                .iter()
                .all(|(name, value)| labels.get(name) == Some(value));
            if matches && vec.remove(&labels).is_ok() {
                deleted += 1;
            }
        }
    }
    deleted
}

struct ProcessMetricsInner {
    registry: Registry,
    /// Held shared by every update and exclusively by `delete_all`, so a
    /// cluster's series disappear all at once
    lifecycle: RwLock<()>,
    items_in_cache: IntGauge,
    sub_account_processed: IntCounterVec,
    sub_account_processed_timestamp: GaugeVec,
    old_metric_published: IntGaugeVec,
    fetched_clusters: IntCounterVec,
    skr_queries: IntCounterVec,
}

/// Per-cluster processing metrics
///
/// Owns its own Prometheus registry. Clones share the same series, so one
/// instance is created at startup and handed to every worker.
#[derive(Clone)]
pub struct ProcessMetrics {
    inner: Arc<ProcessMetricsInner>,
}

impl ProcessMetrics {
    /// Create the metric families and register them in a fresh registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let items_in_cache = IntGauge::with_opts(opts(
            PROCESS_SUBSYSTEM,
            "items_in_cache",
            "Number of items in the cache.",
        ))?;

        let sub_account_processed = IntCounterVec::new(
            opts(
                PROCESS_SUBSYSTEM,
                "sub_account_total",
                "Number of processings per subaccount, including successful and failed.",
            ),
            &label_names(&[SUCCESS_LABEL]),
        )?;

        let sub_account_processed_timestamp = GaugeVec::new(
            opts(
                PROCESS_SUBSYSTEM,
                "sub_account_processed_timestamp_seconds",
                "Unix timestamp (in seconds) of last successful processing of subaccount.",
            ),
            &label_names(&[WITH_OLD_METRIC_LABEL]),
        )?;

        let old_metric_published = IntGaugeVec::new(
            opts(
                PROCESS_SUBSYSTEM,
                "old_metric_published",
                "Number of consecutive re-sends of old metrics to EDP per cluster. \
                 It will reset to 0 when new metric data is published.",
            ),
            &label_names(&[]),
        )?;

        let fetched_clusters = IntCounterVec::new(
            opts(
                PROCESS_SUBSYSTEM,
                "fetched_clusters_total",
                "All clusters fetched from the runtime inventory, including trackable and not trackable.",
            ),
            &label_names(&[TRACKABLE_LABEL]),
        )?;

        let skr_queries = IntCounterVec::new(
            opts(
                SKR_SUBSYSTEM,
                "query_total",
                "Number of queries against the API server of a cluster, per action and outcome.",
            ),
            &label_names(&[SUCCESS_LABEL, ACTION_LABEL]),
        )?;

        registry.register(Box::new(items_in_cache.clone()))?;
        registry.register(Box::new(sub_account_processed.clone()))?;
        registry.register(Box::new(sub_account_processed_timestamp.clone()))?;
        registry.register(Box::new(old_metric_published.clone()))?;
        registry.register(Box::new(fetched_clusters.clone()))?;
        registry.register(Box::new(skr_queries.clone()))?;

        Ok(Self {
            inner: Arc::new(ProcessMetricsInner {
                registry,
                lifecycle: RwLock::new(()),
                items_in_cache,
                sub_account_processed,
                sub_account_processed_timestamp,
                old_metric_published,
                fetched_clusters,
                skr_queries,
            }),
        })
    }

    /// Registry holding every family, for exposition
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Render all series in the Prometheus text format
    pub fn encode_text(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.inner.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    fn with_shared<R>(&self, update: impl FnOnce(&ProcessMetricsInner) -> R) -> R {
        let _guard = self
            .inner
            .lifecycle
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        update(&self.inner)
    }

    /// Count one processing of a cluster
    pub fn record_processed(&self, success: bool, identity: &ClusterIdentity) {
        self.with_shared(|m| {
            m.sub_account_processed
                .with_label_values(&label_values(&[bool_label(success)], identity))
                .inc();
        });
    }

    /// Set the last processed timestamp of a cluster to now
    pub fn record_processed_timestamp(&self, with_old_metric: bool, identity: &ClusterIdentity) {
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        self.with_shared(|m| {
            m.sub_account_processed_timestamp
                .with_label_values(&label_values(&[bool_label(with_old_metric)], identity))
                .set(now);
        });
    }

    /// One more consecutive re-send of a previous record
    pub fn record_stale_republish(&self, identity: &ClusterIdentity) {
        self.with_shared(|m| {
            m.old_metric_published
                .with_label_values(&identity.label_values())
                .inc();
        });
    }

    /// Fresh data was published again
    pub fn reset_stale_republish(&self, identity: &ClusterIdentity) {
        self.with_shared(|m| {
            m.old_metric_published
                .with_label_values(&identity.label_values())
                .set(0);
        });
    }

    /// Count a cluster listed by the runtime inventory
    pub fn record_fetched_cluster(&self, trackable: bool, identity: &ClusterIdentity) {
        self.with_shared(|m| {
            m.fetched_clusters
                .with_label_values(&label_values(&[bool_label(trackable)], identity))
                .inc();
        });
    }

    /// Count one list call against a cluster
    pub fn record_skr_query(&self, success: bool, action: SkrQueryAction, identity: &ClusterIdentity) {
        self.with_shared(|m| {
            m.skr_queries
                .with_label_values(&label_values(&[bool_label(success), action.as_str()], identity))
                .inc();
        });
    }

    /// Number of clusters currently tracked
    pub fn record_cache_size(&self, count: usize) {
        self.with_shared(|m| m.items_in_cache.set(count as i64));
    }

    /// Delete every series labelled with this identity, in all families.
    /// Returns whether anything was deleted.
    pub fn delete_all(&self, identity: &ClusterIdentity) -> bool {
        let matcher: Vec<(&str, &str)> = IDENTITY_LABELS
            .iter()
            .copied()
            .zip(identity.label_values())
            .collect();

        let m = &self.inner;
        let _guard = m.lifecycle.write().unwrap_or_else(PoisonError::into_inner);

        let deleted = delete_partial_match(&m.sub_account_processed, &matcher)
            + delete_partial_match(&m.sub_account_processed_timestamp, &matcher)
            + delete_partial_match(&m.old_metric_published, &matcher)
            + delete_partial_match(&m.fetched_clusters, &matcher)
            + delete_partial_match(&m.skr_queries, &matcher);

        debug!(cluster = %identity, deleted = deleted, "Deleted cluster series");
        deleted > 0
    }
}

/// Structured logger for collector events
///
/// Provides consistent JSON-formatted logging for computations,
/// republishes, and cluster lifecycle changes.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a freshly computed consumption record
    pub fn log_consumption_computed(&self, identity: &ClusterIdentity, record: &ConsumptionRecord) {
        let volumes = &record.compute.provisioned_volumes;
        info!(
            event = "consumption_computed",
            instance = %self.instance,
            shoot_name = %identity.shoot_name,
            runtime_id = %identity.runtime_id,
            sub_account_id = %identity.sub_account_id,
            nodes = record.compute.node_count(),
            provisioned_cpus = record.compute.provisioned_cpus,
            provisioned_ram_gb = record.compute.provisioned_ram_gb,
            volumes = volumes.count,
            volume_size_gb_rounded = volumes.size_gb_rounded,
            load_balancers = record.networking.provisioned_load_balancers,
            "Computed consumption record"
        );
    }

    /// Log a computation that produced no record
    pub fn log_computation_failed(&self, identity: &ClusterIdentity, error: &dyn Display) {
        warn!(
            event = "computation_failed",
            instance = %self.instance,
            shoot_name = %identity.shoot_name,
            runtime_id = %identity.runtime_id,
            sub_account_id = %identity.sub_account_id,
            error = %error,
            "Failed to compute consumption record"
        );
    }

    /// Log a re-send of the previous record
    pub fn log_stale_republish(&self, identity: &ClusterIdentity, computed_at: &str) {
        warn!(
            event = "stale_republish",
            instance = %self.instance,
            shoot_name = %identity.shoot_name,
            runtime_id = %identity.runtime_id,
            sub_account_id = %identity.sub_account_id,
            computed_at = %computed_at,
            "Republishing previous consumption record"
        );
    }

    /// Log that nothing could be published for a cluster this cycle
    pub fn log_nothing_to_publish(&self, identity: &ClusterIdentity) {
        warn!(
            event = "nothing_to_publish",
            instance = %self.instance,
            shoot_name = %identity.shoot_name,
            runtime_id = %identity.runtime_id,
            "No fresh or previous consumption record available"
        );
    }

    /// Log a failed publish
    pub fn log_publish_failed(&self, identity: &ClusterIdentity, error: &dyn Display) {
        warn!(
            event = "publish_failed",
            instance = %self.instance,
            shoot_name = %identity.shoot_name,
            runtime_id = %identity.runtime_id,
            sub_account_id = %identity.sub_account_id,
            error = %error,
            "Failed to publish consumption record"
        );
    }

    /// Log a cluster leaving the tracked set
    pub fn log_cluster_removed(&self, identity: &ClusterIdentity, series_deleted: bool) {
        info!(
            event = "cluster_removed",
            instance = %self.instance,
            shoot_name = %identity.shoot_name,
            runtime_id = %identity.runtime_id,
            sub_account_id = %identity.sub_account_id,
            series_deleted = series_deleted,
            "Cluster no longer tracked"
        );
    }

    /// Log the outcome of an inventory sync
    pub fn log_inventory_sync(&self, fetched: usize, tracked: usize, removed: usize) {
        info!(
            event = "inventory_sync",
            instance = %self.instance,
            fetched = fetched,
            tracked = tracked,
            removed = removed,
            "Synced runtime inventory"
        );
    }

    /// Log collector startup
    pub fn log_startup(&self, version: &str, catalog_vm_types: usize) {
        info!(
            event = "collector_started",
            instance = %self.instance,
            collector_version = %version,
            catalog_vm_types = catalog_vm_types,
            "Metrics collector started"
        );
    }

    /// Log collector shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "collector_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Metrics collector shutting down"
        );
    }
}
