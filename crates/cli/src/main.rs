//! Kyma Metrics Collector CLI
//!
//! Offline tooling around the consumption engine: compute a record from a
//! snapshot file, inspect the cloud spec catalog and capture a snapshot
//! from a live cluster.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{catalog, compute, snapshot};
use kmc_lib::Provider;
use std::path::PathBuf;

/// Kyma Metrics Collector CLI
#[derive(Parser)]
#[command(name = "kmcctl")]
#[command(author, version, about = "CLI for the Kyma Metrics Collector", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the consumption record of a resource snapshot
    Compute {
        /// Cloud spec catalog file
        #[arg(long, env = "KMC_PUBLIC_CLOUD_SPECS_PATH")]
        specs: PathBuf,

        /// Resource snapshot file (JSON)
        #[arg(long)]
        snapshot: PathBuf,
    },

    /// List the VM types the catalog knows for a provider
    VmTypes {
        /// Cloud spec catalog file
        #[arg(long, env = "KMC_PUBLIC_CLOUD_SPECS_PATH")]
        specs: PathBuf,

        /// Provider (azure, aws, gcp, sapconvergedcloud)
        #[arg(long)]
        provider: Provider,
    },

    /// Capture a resource snapshot from a live cluster
    Snapshot {
        /// Provider the cluster runs on
        #[arg(long)]
        provider: Provider,

        /// Path to kubeconfig file (uses default if not specified)
        #[arg(long, env = "KUBECONFIG")]
        kubeconfig: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compute { specs, snapshot } => {
            compute::compute(&specs, &snapshot, cli.format)?;
        }
        Commands::VmTypes { specs, provider } => {
            catalog::list_vm_types(&specs, provider, cli.format)?;
        }
        Commands::Snapshot { provider, kubeconfig } => {
            let kubeconfig = config::kubeconfig_path(kubeconfig)?;
            snapshot::capture(provider, &kubeconfig).await?;
        }
    }

    Ok(())
}
