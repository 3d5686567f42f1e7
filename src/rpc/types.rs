use crate::transfer::FilePortMapping;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub file_name: String,
    pub size: u64,
}

/// The query files of one data variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFileGroup {
    pub data_variable: String,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionParameter {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

/// Request options. Empty lists and a zero gap mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub used_data_var: Vec<String>,
    pub dataset_selection_params: Vec<SelectionParameter>,
    pub ts_neighbour_gap: i64,
    pub search_hours: Vec<u32>,
    pub input_step_difference: Vec<i64>,
    pub selection_data_vars: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub request_id: String,
    pub input_files: Vec<InputFileGroup>,
    pub number_of_results: usize,
    pub correlation_function: String,
    pub options: SearchOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analogue {
    pub timestamp: String,
    pub similarity_value: f64,
    pub time_instances: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcCode {
    InvalidArgument,
    Internal,
    Unavailable,
}

/// Frames a worker streams back for one call: `Mappings`, then `Analogues`, or a
/// terminal `Status` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchResponse {
    Mappings(Vec<FilePortMapping>),
    Analogues {
        analogues: Vec<Analogue>,
        reverse_sort_order_corr_function: bool,
    },
    Status {
        code: RpcCode,
        detail: String,
    },
}
