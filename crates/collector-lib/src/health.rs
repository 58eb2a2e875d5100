//! Health tracking for the collector's probes
//!
//! Components report their state after every cycle; `/healthz` shows the
//! worst of them and `/readyz` additionally waits for the cloud spec
//! catalog to be loaded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still working, but some clusters could not be processed or published
    Degraded,
    Unhealthy,
}

/// Last reported state of a component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const CATALOG: &str = "catalog";
    pub const INVENTORY: &str = "inventory";
    pub const PROCESSOR: &str = "processor";
    pub const PUBLISHER: &str = "publisher";
}

/// Shared registry of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    catalog_loaded: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    /// Report how many of a cycle's work items failed.
    /// Some failures degrade the component, failing all of them makes it unhealthy.
    pub async fn report_cycle(&self, name: &str, attempted: usize, failed: usize) {
        let health = if failed == 0 {
            ComponentHealth::healthy()
        } else if failed < attempted {
            ComponentHealth::degraded(format!("{} of {} failed", failed, attempted))
        } else {
            ComponentHealth::unhealthy(format!("all {} failed", attempted))
        };
        self.update(name, health).await;
    }

    /// Report the outcome of a single operation
    pub async fn report<T, E: Display>(&self, name: &str, result: &Result<T, E>) {
        let health = match result {
            Ok(_) => ComponentHealth::healthy(),
            Err(e) => ComponentHealth::unhealthy(e.to_string()),
        };
        self.update(name, health).await;
    }

    pub async fn set_catalog_loaded(&self, loaded: bool) {
        *self.catalog_loaded.write().await = loaded;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        if !*self.catalog_loaded.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("Cloud spec catalog not loaded".to_string()),
            };
        }

        match self.components.read().await.get(components::CATALOG) {
            Some(catalog) if catalog.status == ComponentStatus::Unhealthy => ReadinessResponse {
                ready: false,
                reason: catalog.message.clone(),
            },
            _ => ReadinessResponse {
                ready: true,
                reason: None,
            },
        }
    }
}
