//! Configuration helpers for the CLI

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Resolve the kubeconfig to use: the explicit path, then `$KUBECONFIG`
/// (already folded into the flag by clap), then `~/.kube/config`
pub fn kubeconfig_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path);
    }

    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".kube").join("config"))
}
