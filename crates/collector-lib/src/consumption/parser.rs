//! Snapshot to consumption record

use super::record::{Compute, ConsumptionRecord, Networking, ProvisionedVolumes, VmType};
use crate::catalog::CloudSpecCatalog;
use crate::error::ConsumptionError;
use crate::models::{ClaimPhase, ResourceSnapshot, ServiceType};
use crate::quantity::Quantity;
use crate::volume::{rounded_to_factor, size_in_gb};
use chrono::Utc;
use std::collections::HashMap;

/// NFS shares are provisioned with three times the claimed capacity
pub const NFS_REPLICATION_FACTOR: u64 = 3;

/// Compute the consumption record of a snapshot.
///
/// Fails on the first node whose VM type is unknown to the catalog for
/// the snapshot's provider, or on the first storage quantity that cannot
/// be parsed. Only bound PVCs are accounted.
pub fn parse(
    snapshot: &ResourceSnapshot,
    catalog: &CloudSpecCatalog,
) -> Result<ConsumptionRecord, ConsumptionError> {
    let mut compute = Compute::default();

    // VM types keep the order in which they are first seen
    let mut vm_type_index: HashMap<&str, usize> = HashMap::new();
    for node in &snapshot.nodes {
        let spec = catalog
            .lookup(snapshot.provider, &node.vm_type)
            .ok_or_else(|| ConsumptionError::VmTypeResolution {
                provider: snapshot.provider,
                vm_type: node.vm_type.clone(),
            })?;

        compute.provisioned_cpus += spec.cpu_cores;
        compute.provisioned_ram_gb += spec.memory_gb;

        match vm_type_index.get(node.vm_type.as_str()) {
            Some(&index) => compute.vm_types[index].count += 1,
            None => {
                vm_type_index.insert(node.vm_type.as_str(), compute.vm_types.len());
                compute.vm_types.push(VmType {
                    name: node.vm_type.clone(),
                    count: 1,
                });
            }
        }
    }

    let volumes = &mut compute.provisioned_volumes;
    for pvc in snapshot.pvcs.iter().filter(|pvc| pvc.phase == ClaimPhase::Bound) {
        let factor = if pvc.nfs { NFS_REPLICATION_FACTOR } else { 1 };
        add_volume(volumes, &pvc.capacity, factor)?;
    }
    if let Some(redis) = &snapshot.redis {
        for instance in redis.iter() {
            add_volume(volumes, &instance.capacity, 1)?;
        }
    }

    let mut networking = Networking::default();
    for service in &snapshot.services {
        let counter = match service.service_type {
            ServiceType::ClusterIp => &mut networking.provisioned_cluster_ips,
            ServiceType::NodePort => &mut networking.provisioned_node_ports,
            ServiceType::LoadBalancer => &mut networking.provisioned_load_balancers,
            ServiceType::ExternalName => &mut networking.provisioned_external_names,
        };
        *counter += 1;
    }

    Ok(ConsumptionRecord {
        timestamp: Utc::now(),
        compute,
        networking,
    })
}

/// Account one volume; rounding applies to each volume on its own
fn add_volume(
    volumes: &mut ProvisionedVolumes,
    capacity: &Quantity,
    factor: u64,
) -> Result<(), ConsumptionError> {
    let size = size_in_gb(capacity)? * factor;
    volumes.size_gb_total += size;
    volumes.size_gb_rounded += rounded_to_factor(size);
    volumes.count += 1;
    Ok(())
}
