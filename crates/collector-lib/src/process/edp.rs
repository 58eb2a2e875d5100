//! Publisher for the event data platform (EDP)

use super::{async_trait, Publisher};
use crate::consumption::ConsumptionRecord;
use crate::models::ClusterIdentity;
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::debug;

/// Where and how records are sent
#[derive(Debug, Clone)]
pub struct EdpConfig {
    pub url: String,
    pub token: String,
    pub namespace: String,
    pub data_stream: String,
    pub data_stream_version: String,
    pub environment: String,
    pub timeout: Duration,
}

/// Sends each record as one event to the sub-account's data tenant
pub struct EdpPublisher {
    client: reqwest::Client,
    config: EdpConfig,
}

impl EdpPublisher {
    pub fn new(config: EdpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build EDP HTTP client")?;
        Ok(Self { client, config })
    }

    /// Event endpoint of a sub-account's data tenant
    pub fn events_url(&self, identity: &ClusterIdentity) -> String {
        format!(
            "{}/namespaces/{}/dataStreams/{}/{}/dataTenants/{}/{}/events",
            self.config.url.trim_end_matches('/'),
            self.config.namespace,
            self.config.data_stream,
            self.config.data_stream_version,
            identity.sub_account_id,
            self.config.environment,
        )
    }
}

#[async_trait]
impl Publisher for EdpPublisher {
    async fn publish(&self, identity: &ClusterIdentity, record: &ConsumptionRecord) -> Result<()> {
        let url = self.events_url(identity);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(record)
            .send()
            .await
            .with_context(|| format!("failed to send event to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("EDP rejected event with status {}: {}", status, body);
        }

        debug!(url = %url, status = %status, "Published consumption record");
        Ok(())
    }
}
