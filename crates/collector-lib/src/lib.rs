//! Core library of the Kyma metrics collector
//!
//! This crate provides:
//! - The cloud spec catalog of VM types per provider
//! - Storage quantity parsing and volume rounding
//! - Consumption computation from a cluster resource snapshot
//! - Per-cluster Prometheus metrics with cleanup on cluster removal
//! - The processing pipeline, its Kubernetes snapshot source and EDP publisher
//! - Health checks and structured logging

pub mod catalog;
pub mod consumption;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod process;
pub mod quantity;
pub mod skr;
pub mod volume;

pub use catalog::{CloudSpecCatalog, SharedCatalog, VmSpec};
pub use consumption::{parse, ConsumptionRecord};
pub use error::{CatalogError, ConsumptionError, QuantityParseError};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{ProcessMetrics, StructuredLogger};
