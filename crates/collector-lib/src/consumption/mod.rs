//! Consumption computation
//!
//! Turns a [`ResourceSnapshot`](crate::models::ResourceSnapshot) of a
//! cluster and the cloud spec catalog into a provider-agnostic
//! [`ConsumptionRecord`]. The computation is pure and all-or-nothing:
//! either every node resolves against the catalog and every quantity
//! parses, or no record is produced at all.

mod parser;
mod record;

#[cfg(test)]
mod tests;

pub use parser::{parse, NFS_REPLICATION_FACTOR};
pub use record::{Compute, ConsumptionRecord, Networking, ProvisionedVolumes, VmType};
