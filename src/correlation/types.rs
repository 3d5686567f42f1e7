//! Correlation function contract.

use crate::array::{DatasetSelectionParameter, Grid};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// A spatial slice together with the instant it was taken at.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlice {
    pub instant: i64,
    pub grid: Grid,
}

impl TimeSlice {
    pub fn new(instant: i64, grid: Grid) -> Self {
        Self { instant, grid }
    }
}

/// Summary a metric needs to bound a comparison made on a sub-region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CorrelationStatistics {
    Empty,
    MeanCount { mean: f64, count: usize },
    Extremes { max: f64, min: f64, count: usize },
}

impl CorrelationStatistics {
    pub fn mean_count(&self) -> Result<(f64, usize)> {
        match self {
            Self::MeanCount { mean, count } => Ok((*mean, *count)),
            other => bail!("Expected mean/count statistics, found {:?}", other),
        }
    }

    pub fn extremes(&self) -> Result<(f64, f64, usize)> {
        match self {
            Self::Extremes { max, min, count } => Ok((*max, *min, *count)),
            other => bail!("Expected max/min/count statistics, found {:?}", other),
        }
    }
}

/// A similarity metric.
///
/// `compare(a, b)` is the single ordering used everywhere: it is true iff `b` is strictly
/// better than `a`, and agrees with sorting by value with `reverse = is_reverse_order()`.
pub trait CorrelationFunction: Send + Sync {
    fn name(&self) -> &str;

    /// Exact similarity of two equally shaped slices of `variable`.
    fn calculate(&self, input: &TimeSlice, dataset: &TimeSlice, variable: &str) -> Result<f64>;

    /// True when larger values are better.
    fn is_reverse_order(&self) -> bool;

    fn compare(&self, value1: f64, value2: f64) -> bool;

    fn setup_stats(&self, slice: &TimeSlice, variable: &str) -> Result<CorrelationStatistics>;

    /// Best and worst similarity reachable given only the selected sub-region of both
    /// slices and their full-region statistics.
    #[allow(unused_variables)]
    fn calculate_partial_value(
        &self,
        input: &TimeSlice,
        dataset: &TimeSlice,
        input_stats: &CorrelationStatistics,
        dataset_stats: &CorrelationStatistics,
        selection: &[DatasetSelectionParameter],
        variable: &str,
    ) -> Result<(f64, f64)> {
        bail!(
            "Correlation function {} does not support partial evaluation",
            self.name()
        )
    }
}

/// Pearson correlation over the non-missing pairs. Zero variance yields `0.0`.
pub fn pearson(a: &Grid, b: &Grid) -> Result<f64> {
    let pairs = a.pairs(b)?;
    if pairs.is_empty() {
        return Ok(0.0);
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut top, mut bottom_a, mut bottom_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        top += (x - mean_a) * (y - mean_b);
        bottom_a += (x - mean_a).powi(2);
        bottom_b += (y - mean_b).powi(2);
    }
    let bottom = (bottom_a * bottom_b).sqrt();
    if bottom == 0.0 {
        return Ok(0.0);
    }
    Ok(top / bottom)
}
