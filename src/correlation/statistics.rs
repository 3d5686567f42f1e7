//! Per-request cache of correlation statistics.

use super::types::{CorrelationFunction, CorrelationStatistics, TimeSlice};

use anyhow::{Result, anyhow};
use std::collections::HashMap;

/// Statistics indexed by (function name, data variable, instant).
#[derive(Debug, Default)]
pub struct StatisticsCollection {
    container: HashMap<String, HashMap<String, HashMap<i64, CorrelationStatistics>>>,
}

impl StatisticsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes and stores the statistics of `slice` for `function`.
    pub fn insert_statistic(
        &mut self,
        function: &dyn CorrelationFunction,
        variable: &str,
        slice: &TimeSlice,
    ) -> Result<CorrelationStatistics> {
        let stats = function.setup_stats(slice, variable)?;
        self.container
            .entry(function.name().to_string())
            .or_default()
            .entry(variable.to_string())
            .or_default()
            .insert(slice.instant, stats);
        Ok(stats)
    }

    pub fn get_statistics(
        &self,
        function_name: &str,
        variable: &str,
        instant: i64,
    ) -> Result<&CorrelationStatistics> {
        let by_var = self
            .container
            .get(function_name)
            .ok_or_else(|| anyhow!("Correlation Function {} does not exist", function_name))?;
        let by_instant = by_var.get(variable).ok_or_else(|| {
            anyhow!(
                "Data variable {} does not exist for correlation metric {}",
                variable,
                function_name
            )
        })?;
        by_instant.get(&instant).ok_or_else(|| {
            anyhow!(
                "Timestamp {} does not exist for correlation metric {} for the data variable {}",
                instant,
                function_name,
                variable
            )
        })
    }

    /// Statistics for `slice`, computed on first use.
    pub fn get_or_insert(
        &mut self,
        function: &dyn CorrelationFunction,
        variable: &str,
        slice: &TimeSlice,
    ) -> Result<CorrelationStatistics> {
        if let Ok(stats) = self.get_statistics(function.name(), variable, slice.instant) {
            return Ok(*stats);
        }
        self.insert_statistic(function, variable, slice)
    }

    /// Drops the statistics of `instant` for every function and variable.
    pub fn remove_instant(&mut self, instant: i64) {
        for by_var in self.container.values_mut() {
            for by_instant in by_var.values_mut() {
                by_instant.remove(&instant);
            }
            by_var.retain(|_, by_instant| !by_instant.is_empty());
        }
        self.container.retain(|_, by_var| !by_var.is_empty());
    }

    pub fn len(&self) -> usize {
        self.container
            .values()
            .flat_map(|by_var| by_var.values())
            .map(|by_instant| by_instant.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
