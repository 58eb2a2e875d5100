//! Consumption record published per cluster and computation cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of nodes running one VM type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmType {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedVolumes {
    pub size_gb_total: u64,
    pub count: u64,
    /// Sum of the per-volume sizes, each rounded up to the billing block
    pub size_gb_rounded: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compute {
    pub vm_types: Vec<VmType>,
    pub provisioned_cpus: u64,
    pub provisioned_ram_gb: u64,
    pub provisioned_volumes: ProvisionedVolumes,
}

impl Compute {
    /// Number of nodes covered by `vm_types`
    pub fn node_count(&self) -> u64 {
        self.vm_types.iter().map(|vm| vm.count).sum()
    }
}

/// Services tallied by how they are exposed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Networking {
    pub provisioned_cluster_ips: u64,
    pub provisioned_node_ports: u64,
    pub provisioned_load_balancers: u64,
    pub provisioned_external_names: u64,
}

/// Normalized resource consumption of a cluster at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub timestamp: DateTime<Utc>,
    pub compute: Compute,
    pub networking: Networking,
}

impl ConsumptionRecord {
    /// Copy of this record stamped with a new instant, used when a
    /// previous record is sent again in place of a fresh one
    pub fn restamped(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            compute: self.compute.clone(),
            networking: self.networking.clone(),
        }
    }
}
