//! Partition manifest (`settings.json`).

use super::time_gap::TimeGapContainer;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const SETTINGS_FILE: &str = "settings.json";

/// Raw `metadata` block of a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetadataBlock {
    pub step: i64,
    pub time_variation_dim: String,
    pub time_initial_dim: String,
    pub data_vars: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_gap: Option<BTreeMap<String, BTreeMap<u32, Vec<String>>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_reduction_parameters: Option<BTreeMap<String, usize>>,
}

/// Whole manifest: file names plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub settings: Vec<String>,
    pub metadata: MetadataBlock,
}

impl Manifest {
    pub fn load(folder: &Path) -> Result<Self> {
        let path = folder.join(SETTINGS_FILE);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid manifest {}", path.display()))
    }
}

/// Read-only descriptor of a partition, built once at construction.
#[derive(Debug, Clone)]
pub struct RepositoryMetadata {
    pub step: i64,
    pub time_variation_dim: String,
    pub time_initial_dim: String,
    pub data_vars: Vec<String>,
    pub time_gaps: TimeGapContainer,
    pub resolution_reduction: Option<BTreeMap<String, usize>>,
}

impl RepositoryMetadata {
    pub fn from_block(block: &MetadataBlock) -> Result<Self> {
        let time_gaps = match &block.time_gap {
            Some(gaps) => TimeGapContainer::from_manifest(gaps)?,
            None => TimeGapContainer::new(),
        };
        Ok(Self {
            step: block.step,
            time_variation_dim: block.time_variation_dim.clone(),
            time_initial_dim: block.time_initial_dim.clone(),
            data_vars: block.data_vars.clone(),
            time_gaps,
            resolution_reduction: block.resolution_reduction_parameters.clone(),
        })
    }

    pub fn has_data_var(&self, var: &str) -> bool {
        self.data_vars.iter().any(|v| v == var)
    }
}
