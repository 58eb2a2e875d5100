//! Per-cluster processing pipeline
//!
//! This module provides:
//! - the seams to the outside world: runtime inventory, snapshot source
//!   and publisher
//! - the [`Processor`], which turns snapshots into consumption records,
//!   falls back to the last published record when a computation fails,
//!   and keeps the per-cluster metrics in step with the tracked set

mod edp;
mod inventory;
mod processor;


pub use edp::{EdpConfig, EdpPublisher};
pub use inventory::FileInventory;
pub use processor::{CycleStats, ProcessOutcome, Processor, ProcessorConfig, SyncStats};

use crate::consumption::ConsumptionRecord;
use crate::models::{ClusterIdentity, ClusterRuntime, ResourceSnapshot};
use anyhow::Result;

pub use async_trait::async_trait;

/// Source of the clusters that exist right now
#[async_trait]
pub trait RuntimeInventory: Send + Sync {
    async fn list(&self) -> Result<Vec<ClusterRuntime>>;
}

/// Lists the resources of one cluster
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, runtime: &ClusterRuntime) -> Result<ResourceSnapshot>;
}

/// Ships consumption records to the telemetry platform
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, identity: &ClusterIdentity, record: &ConsumptionRecord) -> Result<()>;
}
