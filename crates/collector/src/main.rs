//! Kyma Metrics Collector
//!
//! Periodically computes the resource consumption of every tracked
//! cluster and publishes it to the event data platform.

use anyhow::{Context, Result};
use kmc_lib::{
    catalog::{CloudSpecCatalog, SharedCatalog},
    health::{components, ComponentHealth, HealthRegistry},
    observability::{ProcessMetrics, StructuredLogger},
    process::{EdpPublisher, FileInventory, Processor},
    skr::KubeSnapshotSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const COLLECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting kyma-metrics-collector");

    let config = config::CollectorConfig::load()?;
    info!(pod_name = %config.pod_name, "Collector configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::CATALOG).await;
    health_registry.register(components::INVENTORY).await;
    health_registry.register(components::PROCESSOR).await;
    health_registry.register(components::PUBLISHER).await;

    let metrics = ProcessMetrics::new().context("failed to register metrics")?;
    let logger = StructuredLogger::new(&config.pod_name);

    let catalog = CloudSpecCatalog::load(&config.public_cloud_specs_path)
        .context("failed to load public cloud specs")?;
    logger.log_startup(COLLECTOR_VERSION, catalog.len());
    let catalog = SharedCatalog::new(catalog);
    health_registry.set_catalog_loaded(true).await;

    let processor = Arc::new(Processor::new(
        catalog.clone(),
        metrics.clone(),
        Arc::new(KubeSnapshotSource::with_metrics(metrics.clone())),
        Arc::new(EdpPublisher::new(config.edp())?),
        health_registry.clone(),
        config.processor(),
    ));
    let inventory = Arc::new(FileInventory::new(&config.clusters_path));

    let (shutdown_tx, _) = broadcast::channel(1);

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics.clone()));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));
    let loop_handle = tokio::spawn(processor.run(inventory, shutdown_tx.subscribe()));
    tokio::spawn(reload_catalog_on_hangup(
        catalog,
        config.public_cloud_specs_path.clone(),
        health_registry,
    ));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    loop_handle.await?;
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}

/// Reload the catalog from disk on SIGHUP. A broken file leaves the
/// previous catalog in effect.
#[cfg(unix)]
async fn reload_catalog_on_hangup(catalog: SharedCatalog, path: PathBuf, health: HealthRegistry) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGHUP, catalog reload disabled");
            return;
        }
    };

    while hangup.recv().await.is_some() {
        match catalog.reload(&path) {
            Ok(()) => health.register(components::CATALOG).await,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Catalog reload failed, keeping previous catalog");
                health
                    .update(components::CATALOG, ComponentHealth::degraded(e.to_string()))
                    .await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn reload_catalog_on_hangup(_catalog: SharedCatalog, _path: PathBuf, _health: HealthRegistry) {}
