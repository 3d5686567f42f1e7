use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read properties file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse properties file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid property '{property}': {reason}")]
    Invalid { property: String, reason: String },
}

impl ConfigError {
    pub fn invalid(property: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            property: property.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================
// Worker
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControllerKind {
    BruteForce,
    Ndrank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub kafka_ip: Option<String>,
    #[serde(default)]
    pub kafka_port: Option<u16>,
    #[serde(rename = "available_ports")]
    pub available_ports: PortRange,
}

impl NetworkConfig {
    pub fn rpc_address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// A set of partition folders that share one repository kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CorrelationPaths {
    pub average_path: PathBuf,
    pub standard_deviation_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkerProperties {
    pub node_id: String,
    pub network_config: NetworkConfig,
    pub temporary_folder: PathBuf,
    pub controller: ControllerKind,
    pub service: String,
    #[serde(default)]
    pub low_resolution_service: Option<String>,
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub low_resolution_repository: Option<RepositoryConfig>,
    #[serde(default)]
    pub debug_ts_log: bool,
    #[serde(default)]
    pub correlation_functions: Option<CorrelationPaths>,
}

// ============================================================
// Aggregator
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AggregatorProperties {
    pub node_ids: Vec<String>,
    pub kafka_ip: String,
    pub kafka_port: u16,
    pub group_id: String,
    #[serde(default)]
    pub client_id: Option<String>,
}

// ============================================================
// Master
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    pub ip: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpec {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MasterProperties {
    pub results_path: PathBuf,
    pub node_properties: Vec<NodeAddress>,
    #[serde(rename = "dataset_start_date")]
    pub dataset_start_date: DateSpec,
    #[serde(rename = "dataset_end_date")]
    pub dataset_end_date: DateSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RequestOptions {
    pub correlation_function: String,
    pub data_vars: Vec<String>,
    #[serde(default)]
    pub partial_dataset_parameters: BTreeMap<String, Bounds>,
    #[serde(default)]
    pub ts_neighbour_gap: Option<i64>,
    #[serde(default)]
    pub search_hours: Vec<u32>,
    #[serde(default)]
    pub input_step_difference: Vec<i64>,
    #[serde(default)]
    pub data_var_selection: Vec<String>,
}

/// One search of the requests file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RequestDefinition {
    pub request_name: String,
    #[serde(default)]
    pub number_of_results: Option<usize>,
    pub input_path: BTreeMap<String, Vec<PathBuf>>,
    pub time_instances: usize,
    pub options: RequestOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestsFile {
    pub requests: Vec<RequestDefinition>,
}
