//! Coarsening of received query files to the resolution of the low-resolution partition.

use crate::array::{ArrayStore, DatasetFile};
use crate::service::InputFiles;

use anyhow::{Context, Result, anyhow, bail};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const REDUCED_PREFIX: &str = "temp_reduced_";

fn is_time_dim(file: &DatasetFile, dim: &str) -> bool {
    dim == file.variation_dim || dim == file.initial_dim
}

/// Coarsens every spatial dimension named in `factors`.
pub fn reduce_spatial(file: &DatasetFile, factors: &BTreeMap<String, usize>) -> Result<DatasetFile> {
    let mut reduced = file.clone();
    for (dim, factor) in factors {
        if is_time_dim(file, dim) {
            continue;
        }
        reduced = reduced.coarsen_spatial(dim, *factor)?;
    }
    Ok(reduced)
}

fn time_factor(file: &DatasetFile, factors: &BTreeMap<String, usize>) -> Option<usize> {
    factors
        .iter()
        .find(|(dim, _)| is_time_dim(file, dim))
        .map(|(_, factor)| *factor)
}

fn reduced_path(folder: &Path, original: &Path) -> Result<PathBuf> {
    let name = original
        .file_name()
        .ok_or_else(|| anyhow!("Input path {} has no file name", original.display()))?;
    Ok(folder.join(format!("{}{}", REDUCED_PREFIX, name.to_string_lossy())))
}

/// Writes reduced copies of the query files of one variable into `folder`.
///
/// With a time factor `k`, files are ordered by first instant and every `k`
/// consecutive files become one reduced file. Trailing files that do not fill a
/// block are dropped.
pub fn reduce_resolution_single_data_var(
    store: &dyn ArrayStore,
    files: &[PathBuf],
    factors: &BTreeMap<String, usize>,
    folder: &Path,
) -> Result<Vec<PathBuf>> {
    let mut reduced = Vec::with_capacity(files.len());
    for path in files {
        let file = store.open(path)?;
        let target = reduced_path(folder, path)?;
        tracing::debug!("Created reduced file: {}", target.display());
        reduced.push((reduce_spatial(&file, factors)?, target));
    }

    let factor = reduced
        .first()
        .and_then(|(file, _)| time_factor(file, factors));
    if let Some(factor) = factor {
        if factor == 0 {
            bail!("Time reduction factor must be positive");
        }
        reduced.sort_by_key(|(file, _)| file.first_instant());
        let mut blocks = Vec::with_capacity(reduced.len() / factor);
        for chunk in reduced.chunks_exact(factor) {
            let group: Vec<DatasetFile> = chunk.iter().map(|(file, _)| file.clone()).collect();
            blocks.push((DatasetFile::coarsen_time(&group, factor)?, chunk[0].1.clone()));
        }
        reduced = blocks;
    }

    reduced
        .into_iter()
        .map(|(file, target)| {
            store
                .write(&target, &file)
                .with_context(|| format!("Failed to write reduced file {}", target.display()))?;
            Ok(target)
        })
        .collect()
}

/// Reduces every variable of `input` with the factors of `parameters`.
pub fn reduce_resolution(
    store: &dyn ArrayStore,
    input: &InputFiles,
    parameters: &dyn Fn(&str) -> Result<BTreeMap<String, usize>>,
    folder: &Path,
) -> Result<InputFiles> {
    let mut reduced = InputFiles::new();
    for (var, files) in input {
        let factors = parameters(var)?;
        reduced.insert(
            var.clone(),
            reduce_resolution_single_data_var(store, files, &factors, folder)?,
        );
    }
    Ok(reduced)
}
