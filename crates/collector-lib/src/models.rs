//! Core data models for the metrics collector

use crate::quantity::Quantity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Node label carrying the VM type a node runs on
pub const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";

/// PVC label marking claims backed by a managed NFS share
pub const NFS_VOLUME_LABEL: &str = "cloud-resources.kyma-project.io/nfs-volume-name";

/// Stable label set naming a managed cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterIdentity {
    pub shoot_name: String,
    pub instance_id: String,
    pub runtime_id: String,
    pub sub_account_id: String,
    pub global_account_id: String,
}

impl ClusterIdentity {
    /// Label values in the order the metric families declare them
    pub fn label_values(&self) -> [&str; 5] {
        [
            &self.shoot_name,
            &self.instance_id,
            &self.runtime_id,
            &self.sub_account_id,
            &self.global_account_id,
        ]
    }
}

impl fmt::Display for ClusterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.shoot_name, self.runtime_id)
    }
}

/// Cloud provider hosting a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "azure")]
    Azure,
    #[serde(rename = "aws")]
    Aws,
    #[serde(rename = "gcp")]
    Gcp,
    /// SAP Converged Cloud, OpenStack based
    #[serde(rename = "sapconvergedcloud", alias = "openstack")]
    Ccee,
}

impl Provider {
    pub const ALL: [Provider; 4] = [Provider::Azure, Provider::Aws, Provider::Gcp, Provider::Ccee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Azure => "azure",
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Ccee => "sapconvergedcloud",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "azure" => Ok(Provider::Azure),
            "aws" => Ok(Provider::Aws),
            "gcp" => Ok(Provider::Gcp),
            "sapconvergedcloud" | "openstack" => Ok(Provider::Ccee),
            other => {
                let expected: Vec<&str> = Provider::ALL.iter().map(Provider::as_str).collect();
                Err(format!("unknown provider {:?}, expected one of {}", other, expected.join(", ")))
            }
        }
    }
}

/// A cluster node, reduced to what consumption accounting needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    #[serde(default)]
    pub name: String,
    pub vm_type: String,
}

impl NodeDescriptor {
    /// Build a descriptor from the node's instance-type label.
    /// Catalog keys are lower-case, node labels are not always.
    pub fn from_instance_type(name: impl Into<String>, instance_type: &str) -> Self {
        Self {
            name: name.into(),
            vm_type: instance_type.to_lowercase(),
        }
    }
}

/// Lifecycle phase of a persistent volume claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClaimPhase {
    Pending,
    #[default]
    Bound,
    Lost,
}

impl FromStr for ClaimPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ClaimPhase::Pending),
            "Bound" => Ok(ClaimPhase::Bound),
            "Lost" => Ok(ClaimPhase::Lost),
            other => Err(format!("unknown claim phase {:?}", other)),
        }
    }
}

/// A persistent volume claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvcDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub phase: ClaimPhase,
    pub capacity: Quantity,
    /// Backed by a managed NFS share, accounted at three times its capacity
    #[serde(default)]
    pub nfs: bool,
}

/// How a service is exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceType {
    #[default]
    #[serde(rename = "ClusterIP")]
    ClusterIp,
    NodePort,
    LoadBalancer,
    ExternalName,
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ClusterIP" => Ok(ServiceType::ClusterIp),
            "NodePort" => Ok(ServiceType::NodePort),
            "LoadBalancer" => Ok(ServiceType::LoadBalancer),
            "ExternalName" => Ok(ServiceType::ExternalName),
            other => Err(format!("unknown service type {:?}", other)),
        }
    }
}

/// A Kubernetes service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, rename = "type")]
    pub service_type: ServiceType,
}

/// A managed cache instance and its provisioned storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisDescriptor {
    #[serde(default)]
    pub name: String,
    pub capacity: Quantity,
}

/// Managed cache instances, partitioned by the hyperscaler hosting them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisInstances {
    #[serde(default)]
    pub azure: Vec<RedisDescriptor>,
    #[serde(default)]
    pub aws: Vec<RedisDescriptor>,
    #[serde(default)]
    pub gcp: Vec<RedisDescriptor>,
}

impl RedisInstances {
    pub fn iter(&self) -> impl Iterator<Item = &RedisDescriptor> {
        self.azure.iter().chain(self.aws.iter()).chain(self.gcp.iter())
    }
}

/// Everything listed from a cluster for one computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub provider: Provider,
    #[serde(default)]
    pub nodes: Vec<NodeDescriptor>,
    #[serde(default)]
    pub pvcs: Vec<PvcDescriptor>,
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisInstances>,
}

impl ResourceSnapshot {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            nodes: Vec::new(),
            pvcs: Vec::new(),
            services: Vec::new(),
            redis: None,
        }
    }
}

/// A runtime as listed in the inventory, with what is needed to reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRuntime {
    pub identity: ClusterIdentity,
    pub provider: Provider,
    #[serde(default)]
    pub kubeconfig_path: Option<PathBuf>,
    #[serde(default = "default_trackable")]
    pub trackable: bool,
}

fn default_trackable() -> bool {
    true
}
