//! Catalog inspection commands

use anyhow::{Context, Result};
use kmc_lib::{CloudSpecCatalog, Provider};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{print_json, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct VmTypeRow {
    #[tabled(rename = "VM Type")]
    name: String,
    #[tabled(rename = "CPUs")]
    cpu_cores: u64,
    #[tabled(rename = "Memory (GB)")]
    memory_gb: u64,
}

fn vm_type_rows(catalog: &CloudSpecCatalog, provider: Provider) -> Vec<VmTypeRow> {
    catalog
        .vm_types(provider)
        .into_iter()
        .map(|(name, spec)| VmTypeRow {
            name: name.to_string(),
            cpu_cores: spec.cpu_cores,
            memory_gb: spec.memory_gb,
        })
        .collect()
}

pub fn list_vm_types(specs: &Path, provider: Provider, format: OutputFormat) -> Result<()> {
    let catalog = CloudSpecCatalog::load(specs)
        .with_context(|| format!("Failed to load cloud specs {}", specs.display()))?;
    let rows = vm_type_rows(&catalog, provider);

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => print_table(&rows),
    }

    Ok(())
}
