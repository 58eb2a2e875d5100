//! Error types for consumption computation and catalog loading

use crate::models::Provider;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to interpret a resource quantity string such as `20Gi`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityParseError {
    #[error("quantity is empty")]
    Empty,

    #[error("invalid number in quantity {quantity:?}")]
    InvalidNumber { quantity: String },

    #[error("unknown unit suffix {suffix:?} in quantity {quantity:?}")]
    UnknownSuffix { quantity: String, suffix: String },

    #[error("quantity {quantity:?} does not fit into 64 bits of bytes")]
    Overflow { quantity: String },
}

/// Failure of a single consumption computation. No record is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumptionError {
    #[error("providerType: {provider} and nodeType: {vm_type} does not exist in the cloud spec catalog")]
    VmTypeResolution { provider: Provider, vm_type: String },

    #[error("failed to parse storage quantity: {0}")]
    QuantityParse(#[from] QuantityParseError),
}

/// Failure to load the cloud spec catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read cloud spec catalog at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode cloud spec catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown provider {0:?} in cloud spec catalog")]
    UnknownProvider(String),

    #[error("cloud spec catalog contains no providers")]
    Empty,
}
