//! Root mean square difference.

use super::types::{CorrelationFunction, CorrelationStatistics, TimeSlice};
use crate::array::DatasetSelectionParameter;

use anyhow::{Result, bail};

pub const RMSD: &str = "rmsd";

#[derive(Debug, Default)]
pub struct Rmsd;

impl CorrelationFunction for Rmsd {
    fn name(&self) -> &str {
        RMSD
    }

    fn calculate(&self, input: &TimeSlice, dataset: &TimeSlice, variable: &str) -> Result<f64> {
        let pairs = input.grid.pairs(&dataset.grid)?;
        if pairs.is_empty() {
            bail!("Cannot compute rmsd of empty slices for {}", variable);
        }
        let sum: f64 = pairs.iter().map(|(a, b)| (a - b).powi(2)).sum();
        Ok((sum / pairs.len() as f64).sqrt())
    }

    fn is_reverse_order(&self) -> bool {
        false
    }

    fn compare(&self, value1: f64, value2: f64) -> bool {
        value1 > value2
    }

    fn setup_stats(&self, slice: &TimeSlice, _variable: &str) -> Result<CorrelationStatistics> {
        Ok(CorrelationStatistics::Extremes {
            max: slice.grid.max(),
            min: slice.grid.min(),
            count: slice.grid.count(),
        })
    }

    /// The visible region gives the lower bound; the upper bound lets every unseen cell
    /// differ by the widest corner of `input [min, max] x dataset [min, max]`.
    fn calculate_partial_value(
        &self,
        input: &TimeSlice,
        dataset: &TimeSlice,
        input_stats: &CorrelationStatistics,
        dataset_stats: &CorrelationStatistics,
        _selection: &[DatasetSelectionParameter],
        _variable: &str,
    ) -> Result<(f64, f64)> {
        let (input_max, input_min, _) = input_stats.extremes()?;
        let (dataset_max, dataset_min, total) = dataset_stats.extremes()?;
        if total == 0 {
            bail!("Dataset statistics report no values");
        }
        let total = total as f64;

        let common = input
            .grid
            .pairs(&dataset.grid)?
            .iter()
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            / total;

        let widest = [
            (input_max - dataset_max).abs(),
            (input_max - dataset_min).abs(),
            (input_min - dataset_max).abs(),
            (input_min - dataset_min).abs(),
        ]
        .into_iter()
        .fold(0.0, f64::max);
        let partial = input.grid.count() as f64;

        let min = common.sqrt();
        let max = (common + widest.powi(2) * (total - partial) / total).sqrt();
        Ok((min, max))
    }
}
