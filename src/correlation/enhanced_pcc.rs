//! Pearson correlation over climatology-normalised slices.
//!
//! Each slice is turned into anomalies `(x - mean) / std`, where `mean` and `std` are
//! the climatological grids for the slice's month, day and hour. Normalising makes the
//! `+1 / -1` extremes meaningful when bounding a comparison made on a sub-region.

use super::types::{CorrelationFunction, CorrelationStatistics, TimeSlice, pearson};
use crate::array::time::to_datetime;
use crate::array::{ArrayStore, DatasetFile, DatasetSelectionParameter, Grid};

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Timelike};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ENHANCED_PCC: &str = "enhanced_pcc";
pub const AVERAGE_INDEX_FILE: &str = "average.json";
pub const STANDARD_DEVIATION_INDEX_FILE: &str = "standard_deviation.json";

const STD_EPSILON: f64 = 1e-10;

type ClimatologyIndex = BTreeMap<u32, BTreeMap<u32, BTreeMap<u32, String>>>;

/// One folder of per month/day/hour grids with its index (`month -> day -> hour -> file`).
pub struct ClimatologyFiles {
    folder: PathBuf,
    index: ClimatologyIndex,
    store: Arc<dyn ArrayStore>,
    cache: DashMap<(u32, u32, u32), Arc<DatasetFile>>,
}

impl ClimatologyFiles {
    pub fn open(folder: &Path, index_file: &str, store: Arc<dyn ArrayStore>) -> Result<Self> {
        let path = folder.join(index_file);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read climatology index {}", path.display()))?;
        let index: ClimatologyIndex = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid climatology index {}", path.display()))?;
        Ok(Self {
            folder: folder.to_path_buf(),
            index,
            store,
            cache: DashMap::new(),
        })
    }

    fn file_for(&self, instant: i64) -> Result<Arc<DatasetFile>> {
        let dt = to_datetime(instant);
        let key = (dt.month(), dt.day(), dt.hour());
        if let Some(file) = self.cache.get(&key) {
            return Ok(file.clone());
        }
        let name = self
            .index
            .get(&key.0)
            .and_then(|days| days.get(&key.1))
            .and_then(|hours| hours.get(&key.2))
            .ok_or_else(|| {
                anyhow!(
                    "No climatology file for month {} day {} hour {} in {}",
                    key.0,
                    key.1,
                    key.2,
                    self.folder.display()
                )
            })?;
        let file = Arc::new(self.store.open(&self.folder.join(name))?);
        self.cache.insert(key, file.clone());
        Ok(file)
    }

    /// The climatology grid of `variable` for the instant, optionally box-selected.
    pub fn grid(
        &self,
        instant: i64,
        variable: &str,
        selection: Option<&[DatasetSelectionParameter]>,
    ) -> Result<Grid> {
        let file = self.file_for(instant)?;
        let grid = file.step_slice(variable, 0)?;
        match selection {
            Some(selection) => file.select_box(&grid, selection),
            None => Ok(grid),
        }
    }
}

pub struct EnhancedPcc {
    averages: ClimatologyFiles,
    deviations: ClimatologyFiles,
}

impl EnhancedPcc {
    pub fn new(average_path: &Path, deviation_path: &Path, store: Arc<dyn ArrayStore>) -> Result<Self> {
        Ok(Self {
            averages: ClimatologyFiles::open(average_path, AVERAGE_INDEX_FILE, store.clone())?,
            deviations: ClimatologyFiles::open(
                deviation_path,
                STANDARD_DEVIATION_INDEX_FILE,
                store,
            )?,
        })
    }

    /// Anomalies of a slice. Zero deviations are replaced by a tiny epsilon.
    pub fn normalize(
        &self,
        slice: &TimeSlice,
        variable: &str,
        selection: Option<&[DatasetSelectionParameter]>,
    ) -> Result<Grid> {
        let average = self.averages.grid(slice.instant, variable, selection)?;
        let deviation = self
            .deviations
            .grid(slice.instant, variable, selection)?
            .map(|v| if v == 0.0 { STD_EPSILON } else { v });
        slice
            .grid
            .zip_with(&average, |x, m| x - m)?
            .zip_with(&deviation, |x, s| x / s)
    }
}

impl CorrelationFunction for EnhancedPcc {
    fn name(&self) -> &str {
        ENHANCED_PCC
    }

    fn calculate(&self, input: &TimeSlice, dataset: &TimeSlice, variable: &str) -> Result<f64> {
        let input = self.normalize(input, variable, None)?;
        let dataset = self.normalize(dataset, variable, None)?;
        pearson(&input, &dataset)
    }

    fn is_reverse_order(&self) -> bool {
        true
    }

    fn compare(&self, value1: f64, value2: f64) -> bool {
        value1 < value2
    }

    fn setup_stats(&self, slice: &TimeSlice, variable: &str) -> Result<CorrelationStatistics> {
        let normalized = self.normalize(slice, variable, None)?;
        Ok(CorrelationStatistics::MeanCount {
            mean: normalized.mean(),
            count: normalized.count(),
        })
    }

    fn calculate_partial_value(
        &self,
        input: &TimeSlice,
        dataset: &TimeSlice,
        input_stats: &CorrelationStatistics,
        dataset_stats: &CorrelationStatistics,
        selection: &[DatasetSelectionParameter],
        variable: &str,
    ) -> Result<(f64, f64)> {
        let input = self.normalize(input, variable, Some(selection))?;
        let dataset = self.normalize(dataset, variable, Some(selection))?;
        let (input_mean, _) = input_stats.mean_count()?;
        let (dataset_mean, full_count) = dataset_stats.mean_count()?;

        let top: f64 = input
            .pairs(&dataset)?
            .iter()
            .map(|(x, y)| (x - input_mean) * (y - dataset_mean))
            .sum();
        let bottom_input: f64 = input.values().map(|x| (x - input_mean).powi(2)).sum();
        let bottom_dataset: f64 = dataset.values().map(|y| (y - dataset_mean).powi(2)).sum();
        let missing = full_count.saturating_sub(dataset.count()) as f64;

        let bound = |extreme: f64| {
            let numerator = top + (extreme - input_mean) * (extreme - dataset_mean) * missing;
            let denominator = ((bottom_input + (extreme - input_mean).powi(2) * missing)
                * (bottom_dataset + (extreme - dataset_mean).powi(2) * missing))
                .sqrt();
            // Zero variance on either side has no defined correlation.
            if denominator < STD_EPSILON {
                0.0
            } else {
                numerator / denominator
            }
        };

        let mut best = bound(1.0);
        let mut worst = bound(-1.0);
        // The formula does not fix the sign of either extreme.
        if best < worst {
            std::mem::swap(&mut best, &mut worst);
        }
        Ok((best, worst))
    }
}
