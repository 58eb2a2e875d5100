//! Capture a resource snapshot from a live cluster

use anyhow::Result;
use kmc_lib::{skr::KubeSnapshotSource, ClusterIdentity, ClusterRuntime, Provider};
use std::path::Path;

use crate::output::{print_info, print_json};

fn local_runtime(provider: Provider, kubeconfig: &Path) -> ClusterRuntime {
    ClusterRuntime {
        identity: ClusterIdentity {
            shoot_name: "local".to_string(),
            instance_id: String::new(),
            runtime_id: String::new(),
            sub_account_id: String::new(),
            global_account_id: String::new(),
        },
        provider,
        kubeconfig_path: Some(kubeconfig.to_path_buf()),
        trackable: true,
    }
}

/// Print the snapshot as JSON, ready to be fed to `kmcctl compute`
pub async fn capture(provider: Provider, kubeconfig: &Path) -> Result<()> {
    print_info(&format!("Reading cluster from {}", kubeconfig.display()));

    let runtime = local_runtime(provider, kubeconfig);
    let client = KubeSnapshotSource::client(Some(kubeconfig)).await?;
    let snapshot = KubeSnapshotSource::new().snapshot_with(client, &runtime).await?;

    print_json(&snapshot)
}
