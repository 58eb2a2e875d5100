//! Processing of tracked clusters

use super::{Publisher, RuntimeInventory, SnapshotSource};
use crate::catalog::SharedCatalog;
use crate::consumption::{parse, ConsumptionRecord};
use crate::health::{components, HealthRegistry};
use crate::models::{ClusterIdentity, ClusterRuntime};
use crate::observability::{ProcessMetrics, StructuredLogger};
use anyhow::{Context, Result};
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Configuration of the processor
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Clusters processed concurrently (default: 5)
    pub worker_pool_size: usize,
    /// Time between processing cycles (default: 5 minutes)
    pub scrape_interval: Duration,
    /// Name of this collector instance, used in logs
    pub instance_name: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 5,
            scrape_interval: Duration::from_secs(300),
            instance_name: "kmc".to_string(),
        }
    }
}

/// What a processing pass published for a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A freshly computed record
    Fresh,
    /// The previous record, because no fresh one could be computed
    Stale,
    /// Nothing, no record was ever computed for this cluster
    Skipped,
}

/// Result of reconciling the tracked set with the inventory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub fetched: usize,
    pub tracked: usize,
    pub removed: usize,
}

/// Result of one processing cycle over all tracked clusters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub fresh: usize,
    pub stale: usize,
    pub skipped: usize,
    pub publish_failures: usize,
}

impl CycleStats {
    pub fn attempted(&self) -> usize {
        self.fresh + self.stale + self.skipped + self.publish_failures
    }

    fn record(&mut self, result: &Result<ProcessOutcome>) {
        match result {
            Ok(ProcessOutcome::Fresh) => self.fresh += 1,
            Ok(ProcessOutcome::Stale) => self.stale += 1,
            Ok(ProcessOutcome::Skipped) => self.skipped += 1,
            Err(_) => self.publish_failures += 1,
        }
    }
}

/// Processes tracked clusters and keeps their metrics bounded to the tracked set
pub struct Processor {
    catalog: SharedCatalog,
    metrics: ProcessMetrics,
    source: Arc<dyn SnapshotSource>,
    publisher: Arc<dyn Publisher>,
    health: HealthRegistry,
    logger: StructuredLogger,
    config: ProcessorConfig,
    workers: Arc<Semaphore>,
    /// Clusters currently tracked, the cache whose size is exported
    tracked: DashMap<ClusterIdentity, ClusterRuntime>,
    /// Last freshly computed record per tracked cluster
    last_published: DashMap<ClusterIdentity, ConsumptionRecord>,
    /// Every cluster listed by the last inventory sync, trackable or not
    listed: DashSet<ClusterIdentity>,
}

impl Processor {
    pub fn new(
        catalog: SharedCatalog,
        metrics: ProcessMetrics,
        source: Arc<dyn SnapshotSource>,
        publisher: Arc<dyn Publisher>,
        health: HealthRegistry,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            catalog,
            metrics,
            source,
            publisher,
            health,
            logger: StructuredLogger::new(config.instance_name.clone()),
            workers: Arc::new(Semaphore::new(config.worker_pool_size.max(1))),
            config,
            tracked: DashMap::new(),
            last_published: DashMap::new(),
            listed: DashSet::new(),
        }
    }

    /// Number of clusters currently tracked
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_tracked(&self, identity: &ClusterIdentity) -> bool {
        self.tracked.contains_key(identity)
    }

    /// Last freshly computed record of a cluster
    pub fn last_record(&self, identity: &ClusterIdentity) -> Option<ConsumptionRecord> {
        self.last_published.get(identity).map(|r| r.value().clone())
    }

    /// Replace the tracked set with the trackable runtimes of the inventory.
    /// Clusters that dropped out lose their cached record and all their series.
    /// A cluster that turned untrackable keeps only its fetched counter until
    /// it leaves the inventory.
    pub fn sync_clusters(&self, runtimes: Vec<ClusterRuntime>) -> SyncStats {
        let fetched = runtimes.len();
        let listed: HashSet<&ClusterIdentity> = runtimes.iter().map(|r| &r.identity).collect();
        let current: HashMap<ClusterIdentity, &ClusterRuntime> = runtimes
            .iter()
            .filter(|r| r.trackable)
            .map(|r| (r.identity.clone(), r))
            .collect();

        let gone: Vec<ClusterIdentity> = self
            .tracked
            .iter()
            .filter(|entry| !current.contains_key(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        for identity in &gone {
            self.tracked.remove(identity);
            self.last_published.remove(identity);
            let deleted = self.metrics.delete_all(identity);
            self.logger.log_cluster_removed(identity, deleted);
        }

        let absent: Vec<ClusterIdentity> = self
            .listed
            .iter()
            .filter(|identity| !listed.contains(identity.key()))
            .map(|identity| identity.key().clone())
            .collect();

        for identity in &absent {
            self.listed.remove(identity);
            // Untracked clusters only carry their fetched counter
            if !gone.contains(identity) {
                let deleted = self.metrics.delete_all(identity);
                debug!(cluster = %identity, series_deleted = deleted, "Dropped untracked cluster");
            }
        }

        // Recorded after the cleanup so a cluster that turned untrackable
        // keeps its fetched counter
        for runtime in &runtimes {
            self.metrics
                .record_fetched_cluster(runtime.trackable, &runtime.identity);
            self.listed.insert(runtime.identity.clone());
        }

        for (identity, runtime) in current {
            self.tracked.insert(identity, runtime.clone());
        }

        let stats = SyncStats {
            fetched,
            tracked: self.tracked.len(),
            removed: gone.len(),
        };
        self.metrics.record_cache_size(stats.tracked);
        self.logger
            .log_inventory_sync(stats.fetched, stats.tracked, stats.removed);
        stats
    }

    /// Compute and publish the record of one cluster.
    ///
    /// A failed snapshot or computation falls back to republishing the last
    /// fresh record. Only a failed publish is returned as an error.
    pub async fn process_cluster(&self, runtime: &ClusterRuntime) -> Result<ProcessOutcome> {
        let identity = &runtime.identity;

        let computed = match self.source.snapshot(runtime).await {
            Ok(snapshot) => parse(&snapshot, &self.catalog.current()).map_err(anyhow::Error::from),
            Err(e) => Err(e.context("failed to list cluster resources")),
        };

        match computed {
            Ok(record) => {
                self.metrics.record_processed(true, identity);
                self.logger.log_consumption_computed(identity, &record);

                self.publish(identity, &record).await?;
                self.metrics.record_processed_timestamp(false, identity);
                self.metrics.reset_stale_republish(identity);

                // A cluster removed while it was being processed stays removed
                if self.is_tracked(identity) {
                    self.last_published.insert(identity.clone(), record);
                }
                Ok(ProcessOutcome::Fresh)
            }
            Err(e) => {
                self.metrics.record_processed(false, identity);
                self.logger.log_computation_failed(identity, &format!("{:#}", e));

                let Some(previous) = self.last_record(identity) else {
                    self.logger.log_nothing_to_publish(identity);
                    return Ok(ProcessOutcome::Skipped);
                };

                self.logger
                    .log_stale_republish(identity, &previous.timestamp.to_rfc3339());
                let record = previous.restamped(Utc::now());
                self.publish(identity, &record).await?;
                self.metrics.record_stale_republish(identity);
                self.metrics.record_processed_timestamp(true, identity);
                Ok(ProcessOutcome::Stale)
            }
        }
    }

    async fn publish(&self, identity: &ClusterIdentity, record: &ConsumptionRecord) -> Result<()> {
        let result = self
            .publisher
            .publish(identity, record)
            .await
            .with_context(|| format!("failed to publish consumption record for {}", identity));
        if let Err(e) = &result {
            self.logger.log_publish_failed(identity, &format!("{:#}", e));
        }
        result
    }

    /// Process every tracked cluster, at most `worker_pool_size` at a time
    pub async fn process_all(self: &Arc<Self>) -> CycleStats {
        let runtimes: Vec<ClusterRuntime> = self.tracked.iter().map(|e| e.value().clone()).collect();
        let mut tasks = JoinSet::new();

        for runtime in runtimes {
            let processor = Arc::clone(self);
            let workers = Arc::clone(&self.workers);
            tasks.spawn(async move {
                let _permit = workers.acquire_owned().await?;
                processor.process_cluster(&runtime).await
            });
        }

        let mut stats = CycleStats::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => stats.record(&result),
                Err(e) => {
                    warn!(error = %e, "Processing task aborted");
                    stats.publish_failures += 1;
                }
            }
        }
        stats
    }

    /// One full cycle: sync with the inventory, then process.
    /// If the inventory cannot be read the previous tracked set is processed.
    pub async fn run_cycle(self: &Arc<Self>, inventory: &dyn RuntimeInventory) -> CycleStats {
        let listed = inventory.list().await;
        self.health
            .report(components::INVENTORY, &listed.as_ref().map_err(|e| format!("{:#}", e)))
            .await;
        match listed {
            Ok(runtimes) => {
                self.sync_clusters(runtimes);
            }
            Err(e) => warn!(error = %format!("{:#}", e), "Failed to list runtimes, keeping tracked set"),
        }

        let stats = self.process_all().await;
        let attempted = stats.attempted();
        self.health
            .report_cycle(components::PROCESSOR, attempted, stats.stale + stats.skipped)
            .await;
        self.health
            .report_cycle(
                components::PUBLISHER,
                stats.fresh + stats.stale + stats.publish_failures,
                stats.publish_failures,
            )
            .await;

        debug!(
            fresh = stats.fresh,
            stale = stats.stale,
            skipped = stats.skipped,
            publish_failures = stats.publish_failures,
            "Processing cycle complete"
        );
        stats
    }

    /// Run cycles every scrape interval until shutdown is signalled
    pub async fn run(
        self: Arc<Self>,
        inventory: Arc<dyn RuntimeInventory>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(
            interval_secs = self.config.scrape_interval.as_secs(),
            workers = self.config.worker_pool_size,
            "Starting processing loop"
        );

        let mut ticker = interval(self.config.scrape_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle(inventory.as_ref()).await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down processing loop");
                    break;
                }
            }
        }
    }
}
