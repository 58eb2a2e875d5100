//! Collector configuration

use anyhow::{Context, Result};
use kmc_lib::process::{EdpConfig, ProcessorConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Collector configuration, read from `KMC_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Pod name from the Kubernetes downward API
    #[serde(default = "default_pod_name")]
    pub pod_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Public cloud specs file the catalog is loaded from
    #[serde(default = "default_public_cloud_specs_path")]
    pub public_cloud_specs_path: PathBuf,

    /// Runtime inventory file
    #[serde(default = "default_clusters_path")]
    pub clusters_path: PathBuf,

    /// Seconds between processing cycles
    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_secs: u64,

    /// Clusters processed concurrently
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    #[serde(default = "default_edp_url")]
    pub edp_url: String,

    #[serde(default)]
    pub edp_token: String,

    #[serde(default = "default_edp_namespace")]
    pub edp_namespace: String,

    #[serde(default = "default_edp_data_stream")]
    pub edp_data_stream: String,

    #[serde(default = "default_edp_data_stream_version")]
    pub edp_data_stream_version: String,

    #[serde(default = "default_edp_environment")]
    pub edp_environment: String,

    #[serde(default = "default_edp_timeout")]
    pub edp_timeout_secs: u64,
}

fn default_pod_name() -> String {
    std::env::var("POD_NAME").unwrap_or_else(|_| "kmc".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_public_cloud_specs_path() -> PathBuf {
    PathBuf::from("/config/public-cloud-specs.json")
}

fn default_clusters_path() -> PathBuf {
    PathBuf::from("/config/clusters.json")
}

fn default_scrape_interval() -> u64 {
    300
}

fn default_worker_pool_size() -> usize {
    5
}

fn default_edp_url() -> String {
    "http://edp:8080".to_string()
}

fn default_edp_namespace() -> String {
    "kyma-dev".to_string()
}

fn default_edp_data_stream() -> String {
    "consumption-metrics".to_string()
}

fn default_edp_data_stream_version() -> String {
    "v1".to_string()
}

fn default_edp_environment() -> String {
    "dev".to_string()
}

fn default_edp_timeout() -> u64 {
    30
}

impl CollectorConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("KMC").try_parsing(true))
            .build()?;

        config
            .try_deserialize()
            .context("invalid KMC_* configuration")
    }

    pub fn processor(&self) -> ProcessorConfig {
        ProcessorConfig {
            worker_pool_size: self.worker_pool_size,
            scrape_interval: Duration::from_secs(self.scrape_interval_secs),
            instance_name: self.pod_name.clone(),
        }
    }

    pub fn edp(&self) -> EdpConfig {
        EdpConfig {
            url: self.edp_url.clone(),
            token: self.edp_token.clone(),
            namespace: self.edp_namespace.clone(),
            data_stream: self.edp_data_stream.clone(),
            data_stream_version: self.edp_data_stream_version.clone(),
            environment: self.edp_environment.clone(),
            timeout: Duration::from_secs(self.edp_timeout_secs),
        }
    }
}
