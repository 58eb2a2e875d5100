//! Cloud spec catalog
//!
//! Static per-provider table of VM type name to vCPU and memory. The
//! catalog is loaded once from the public cloud specs file and never
//! edited in place; [`SharedCatalog`] swaps in a whole new table when
//! the file is reloaded, so readers always see one consistent version.

use crate::error::CatalogError;
use crate::models::Provider;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Hardware specification of a VM type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSpec {
    pub cpu_cores: u64,
    /// Memory in GB
    #[serde(rename = "memory")]
    pub memory_gb: u64,
}

/// Read-only table of VM type specifications, keyed by provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudSpecCatalog {
    providers: HashMap<Provider, HashMap<String, VmSpec>>,
}

impl CloudSpecCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a VM type; used to assemble catalogs in code
    pub fn with_vm_type(mut self, provider: Provider, vm_type: impl Into<String>, spec: VmSpec) -> Self {
        self.providers
            .entry(provider)
            .or_default()
            .insert(vm_type.into(), spec);
        self
    }

    /// Decode a catalog from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: HashMap<String, HashMap<String, VmSpec>> = serde_json::from_str(json)?;

        let mut providers: HashMap<Provider, HashMap<String, VmSpec>> = HashMap::new();
        for (name, vm_types) in raw {
            let provider: Provider = name
                .parse()
                .map_err(|_| CatalogError::UnknownProvider(name.clone()))?;
            providers.entry(provider).or_default().extend(vm_types);
        }

        if providers.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self { providers })
    }

    /// Load the catalog from a public cloud specs file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&content)?;

        info!(
            path = %path.display(),
            providers = catalog.providers.len(),
            vm_types = catalog.len(),
            "Loaded cloud spec catalog"
        );

        Ok(catalog)
    }

    /// Specification of a VM type. Names are matched case-sensitively.
    pub fn lookup(&self, provider: Provider, vm_type: &str) -> Option<&VmSpec> {
        self.providers.get(&provider)?.get(vm_type)
    }

    /// All VM types of a provider, sorted by name
    pub fn vm_types(&self, provider: Provider) -> BTreeMap<&str, VmSpec> {
        self.providers
            .get(&provider)
            .map(|types| types.iter().map(|(name, spec)| (name.as_str(), *spec)).collect())
            .unwrap_or_default()
    }

    /// Total number of VM types across providers
    pub fn len(&self) -> usize {
        self.providers.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide handle to the current catalog
#[derive(Debug, Clone)]
pub struct SharedCatalog {
    current: Arc<RwLock<Arc<CloudSpecCatalog>>>,
}

impl SharedCatalog {
    pub fn new(catalog: CloudSpecCatalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    /// The catalog in effect right now. Holding the returned `Arc` pins
    /// that version for the duration of a computation.
    pub fn current(&self) -> Arc<CloudSpecCatalog> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new catalog
    pub fn replace(&self, catalog: CloudSpecCatalog) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(catalog);
    }

    /// Reload from disk. On failure the previous catalog stays in effect.
    pub fn reload(&self, path: &Path) -> Result<(), CatalogError> {
        let catalog = CloudSpecCatalog::load(path)?;
        self.replace(catalog);
        Ok(())
    }
}
