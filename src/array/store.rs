//! Array file codec.

use super::dataset::DatasetFile;

use anyhow::{Context, Result};
use std::path::Path;

/// Reads and writes partition files.
pub trait ArrayStore: Send + Sync {
    fn open(&self, path: &Path) -> Result<DatasetFile>;
    fn write(&self, path: &Path, file: &DatasetFile) -> Result<()>;
}

/// `bincode` encoding of `DatasetFile`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeStore;

impl ArrayStore for BincodeStore {
    fn open(&self, path: &Path) -> Result<DatasetFile> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read array file {}", path.display()))?;
        bincode::deserialize(&bytes)
            .with_context(|| format!("Failed to decode array file {}", path.display()))
    }

    fn write(&self, path: &Path, file: &DatasetFile) -> Result<()> {
        let bytes = bincode::serialize(file)?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write array file {}", path.display()))
    }
}
