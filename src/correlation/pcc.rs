//! Plain Pearson correlation coefficient.

use super::types::{CorrelationFunction, CorrelationStatistics, TimeSlice, pearson};

use anyhow::Result;

pub const PCC: &str = "pcc";

#[derive(Debug, Default)]
pub struct Pcc;

impl CorrelationFunction for Pcc {
    fn name(&self) -> &str {
        PCC
    }

    fn calculate(&self, input: &TimeSlice, dataset: &TimeSlice, _variable: &str) -> Result<f64> {
        pearson(&input.grid, &dataset.grid)
    }

    fn is_reverse_order(&self) -> bool {
        true
    }

    fn compare(&self, value1: f64, value2: f64) -> bool {
        value1 < value2
    }

    fn setup_stats(&self, _slice: &TimeSlice, _variable: &str) -> Result<CorrelationStatistics> {
        Ok(CorrelationStatistics::Empty)
    }
}
