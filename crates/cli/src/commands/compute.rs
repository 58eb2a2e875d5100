//! Compute a consumption record from a snapshot file

use anyhow::{Context, Result};
use colored::Colorize;
use kmc_lib::{consumption, CloudSpecCatalog, ConsumptionRecord, ResourceSnapshot};
use std::path::Path;
use tabled::Tabled;

use crate::output::{format_gb, print_heading, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct VmTypeRow {
    #[tabled(rename = "VM Type")]
    name: String,
    #[tabled(rename = "Nodes")]
    count: u64,
}

pub fn read_snapshot(path: &Path) -> Result<ResourceSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

/// Load both files and run the parser
pub fn compute_record(specs: &Path, snapshot: &Path) -> Result<ConsumptionRecord> {
    let catalog = CloudSpecCatalog::load(specs)
        .with_context(|| format!("Failed to load cloud specs {}", specs.display()))?;
    let snapshot = read_snapshot(snapshot)?;
    Ok(consumption::parse(&snapshot, &catalog)?)
}

pub fn compute(specs: &Path, snapshot: &Path, format: OutputFormat) -> Result<()> {
    let record = compute_record(specs, snapshot)?;

    match format {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Table => print_record(&record),
    }

    Ok(())
}

fn print_record(record: &ConsumptionRecord) {
    let compute = &record.compute;
    let volumes = &compute.provisioned_volumes;
    let networking = &record.networking;

    print_heading("Consumption");
    println!("Computed at:            {}", record.timestamp.to_rfc3339().dimmed());
    println!("Nodes:                  {}", compute.node_count());
    println!("Provisioned CPUs:       {}", compute.provisioned_cpus.to_string().cyan());
    println!("Provisioned RAM:        {}", format!("{} GB", compute.provisioned_ram_gb).cyan());
    println!(
        "Volumes:                {} totalling {}",
        volumes.count,
        format_gb(volumes.size_gb_total, volumes.size_gb_rounded).cyan()
    );
    println!();

    println!("{}", "VM Types".bold());
    let rows: Vec<VmTypeRow> = compute
        .vm_types
        .iter()
        .map(|vm| VmTypeRow {
            name: vm.name.clone(),
            count: vm.count,
        })
        .collect();
    print_table(&rows);
    println!();

    println!("{}", "Networking".bold());
    println!("{}", "-".repeat(50));
    println!("ClusterIP:              {}", networking.provisioned_cluster_ips);
    println!("NodePort:               {}", networking.provisioned_node_ports);
    println!("LoadBalancer:           {}", networking.provisioned_load_balancers);
    println!("ExternalName:           {}", networking.provisioned_external_names);
}
