//! Snapshot source reading a cluster's API server
//!
//! Lists nodes, persistent volume claims and services with a kubeconfig
//! per cluster and reduces them to the descriptors the consumption parser
//! works on. Managed cache instances are not listed.

use crate::models::{
    ClaimPhase, ClusterIdentity, ClusterRuntime, NodeDescriptor, PvcDescriptor, ResourceSnapshot,
    ServiceDescriptor, ServiceType, INSTANCE_TYPE_LABEL, NFS_VOLUME_LABEL,
};
use crate::observability::{ProcessMetrics, SkrQueryAction};
use crate::process::{async_trait, SnapshotSource};
use crate::quantity::Quantity;
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Node, PersistentVolumeClaim, Service};
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::path::Path;
use tracing::debug;

/// Reduce a node to its VM type. A node without the instance-type label
/// gets an empty VM type, which no catalog resolves.
pub fn node_descriptor(node: &Node) -> NodeDescriptor {
    let instance_type = node
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(INSTANCE_TYPE_LABEL))
        .map(String::as_str)
        .unwrap_or_default();
    NodeDescriptor::from_instance_type(node.metadata.name.clone().unwrap_or_default(), instance_type)
}

/// Reduce a claim to phase and size. The bound capacity wins over the
/// requested size.
pub fn pvc_descriptor(pvc: &PersistentVolumeClaim) -> PvcDescriptor {
    let status = pvc.status.as_ref();
    let phase = status
        .and_then(|s| s.phase.as_deref())
        .and_then(|p| p.parse().ok())
        .unwrap_or(ClaimPhase::Pending);

    let bound = status
        .and_then(|s| s.capacity.as_ref())
        .and_then(|c| c.get("storage"));
    let requested = pvc
        .spec
        .as_ref()
        .and_then(|s| s.resources.as_ref())
        .and_then(|r| r.requests.as_ref())
        .and_then(|r| r.get("storage"));
    let capacity = bound
        .or(requested)
        .map(|q| Quantity::new(q.0.clone()))
        .unwrap_or_else(|| Quantity::new("0"));

    let nfs = pvc
        .metadata
        .labels
        .as_ref()
        .is_some_and(|labels| labels.contains_key(NFS_VOLUME_LABEL));

    PvcDescriptor {
        name: pvc.metadata.name.clone().unwrap_or_default(),
        namespace: pvc.metadata.namespace.clone().unwrap_or_default(),
        phase,
        capacity,
        nfs,
    }
}

/// Reduce a service to its exposure type
pub fn service_descriptor(service: &Service) -> ServiceDescriptor {
    let service_type = service
        .spec
        .as_ref()
        .and_then(|s| s.type_.as_deref())
        .and_then(|t| t.parse::<ServiceType>().ok())
        .unwrap_or_default();

    ServiceDescriptor {
        name: service.metadata.name.clone().unwrap_or_default(),
        namespace: service.metadata.namespace.clone().unwrap_or_default(),
        service_type,
    }
}

/// Kubernetes backed snapshot source
#[derive(Clone, Default)]
pub struct KubeSnapshotSource {
    metrics: Option<ProcessMetrics>,
}

impl KubeSnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every list call in the SKR query metric
    pub fn with_metrics(metrics: ProcessMetrics) -> Self {
        Self {
            metrics: Some(metrics),
        }
    }

    /// Client for a kubeconfig file, or for the ambient configuration
    pub async fn client(kubeconfig: Option<&Path>) -> Result<Client> {
        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
            }
            None => Config::infer().await?,
        };
        Ok(Client::try_from(config)?)
    }

    async fn list<K>(&self, client: Client, action: SkrQueryAction, identity: &ClusterIdentity) -> Result<Vec<K>>
    where
        K: Resource + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::all(client);
        let result = api.list(&ListParams::default()).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_skr_query(result.is_ok(), action, identity);
        }

        let list = result.with_context(|| format!("{} failed", action.as_str()))?;
        debug!(cluster = %identity, action = action.as_str(), items = list.items.len(), "Listed resources");
        Ok(list.items)
    }

    /// Capture a snapshot with an existing client
    pub async fn snapshot_with(&self, client: Client, runtime: &ClusterRuntime) -> Result<ResourceSnapshot> {
        let identity = &runtime.identity;
        let nodes: Vec<Node> = self.list(client.clone(), SkrQueryAction::ListNodes, identity).await?;
        let pvcs: Vec<PersistentVolumeClaim> = self.list(client.clone(), SkrQueryAction::ListPvcs, identity).await?;
        let services: Vec<Service> = self.list(client, SkrQueryAction::ListServices, identity).await?;

        Ok(ResourceSnapshot {
            provider: runtime.provider,
            nodes: nodes.iter().map(node_descriptor).collect(),
            pvcs: pvcs.iter().map(pvc_descriptor).collect(),
            services: services.iter().map(service_descriptor).collect(),
            redis: None,
        })
    }
}

#[async_trait]
impl SnapshotSource for KubeSnapshotSource {
    async fn snapshot(&self, runtime: &ClusterRuntime) -> Result<ResourceSnapshot> {
        let client = Self::client(runtime.kubeconfig_path.as_deref()).await?;
        self.snapshot_with(client, runtime).await
    }
}
