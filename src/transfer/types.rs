use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata the master declares for each input file before sending it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFileProperties {
    pub file_name: String,
    pub file_size: u64,
    pub data_variable: String,
}

impl InputFileProperties {
    pub fn new(file_name: &str, file_size: u64, data_variable: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            file_size,
            data_variable: data_variable.to_string(),
        }
    }

    /// The file name without any leading path.
    pub fn base_name(&self) -> &str {
        self.file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file_name)
    }
}

/// One entry of the mapping message sent back to the master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePortMapping {
    pub file: String,
    pub port: u16,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Unable to map all {requested} files to a port in [{from}, {to})")]
    OutOfSocketPorts { requested: usize, from: u16, to: u16 },

    #[error("'to_port' must be bigger than 'from_port' ({from} >= {to})")]
    InvalidPortRange { from: u16, to: u16 },

    #[error("Received too many empty packets in a row while receiving {file}")]
    Timeout { file: String },

    #[error("Exceptions thrown from sockets dealing with file transfer: {}", .0.join("; "))]
    Combined(Vec<String>),
}
