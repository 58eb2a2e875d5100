//! Runtime inventory backed by a JSON file

use super::{async_trait, RuntimeInventory};
use crate::models::ClusterRuntime;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Reads the list of runtimes from a file on every call, so edits are
/// picked up on the next cycle
pub struct FileInventory {
    path: PathBuf,
}

impl FileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RuntimeInventory for FileInventory {
    async fn list(&self) -> Result<Vec<ClusterRuntime>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read runtime inventory {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime inventory {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_runtimes_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clusters.json");
        tokio::fs::write(
            &path,
            r#"[
                {
                    "identity": {
                        "shoot_name": "c-1",
                        "instance_id": "i-1",
                        "runtime_id": "r-1",
                        "sub_account_id": "sa-1",
                        "global_account_id": "ga-1"
                    },
                    "provider": "azure",
                    "kubeconfig_path": "/kubeconfigs/c-1.yaml"
                },
                {
                    "identity": {
                        "shoot_name": "c-2",
                        "instance_id": "i-2",
                        "runtime_id": "r-2",
                        "sub_account_id": "sa-2",
                        "global_account_id": "ga-2"
                    },
                    "provider": "openstack",
                    "trackable": false
                }
            ]"#,
        )
        .await
        .unwrap();

        let runtimes = FileInventory::new(&path).list().await.unwrap();

        assert_eq!(runtimes.len(), 2);
        assert_eq!(runtimes[0].provider, Provider::Azure);
        assert!(runtimes[0].trackable);
        assert_eq!(runtimes[1].provider, Provider::Ccee);
        assert!(!runtimes[1].trackable);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = FileInventory::new(dir.path().join("absent.json")).list().await;
        assert!(result.is_err());
    }
}
