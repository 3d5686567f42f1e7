//! Search accumulators and request options.

use crate::array::DatasetSelectionParameter;

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Results keyed by candidate start instant.
pub type SearchResults = BTreeMap<i64, ResultContainer>;
/// Candidates keyed by candidate start instant.
pub type CandidateResults = BTreeMap<i64, CandidateContainer>;
/// Received input files grouped by data variable.
pub type InputFiles = BTreeMap<String, Vec<PathBuf>>;

/// Running sum of similarity contributions for one start instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultContainer {
    pub value: f64,
    pub sum_counter: usize,
}

impl ResultContainer {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            sum_counter: 1,
        }
    }

    pub fn add_value(&mut self, value: f64) {
        self.value += value;
        self.sum_counter += 1;
    }

    /// Folds another node's partial sum into this one.
    pub fn merge(&mut self, value: f64, sum_counter: usize) {
        self.value += value;
        self.sum_counter += sum_counter;
    }

    pub fn average(&self) -> f64 {
        self.value / self.sum_counter as f64
    }
}

/// Running best/worst bound sums with one contribution counter per data variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateContainer {
    best_value: f64,
    worst_value: f64,
    counters: BTreeMap<String, usize>,
    is_final: bool,
}

impl CandidateContainer {
    pub fn new(best_value: f64, worst_value: f64, data_vars: &[String]) -> Self {
        Self {
            best_value,
            worst_value,
            counters: data_vars.iter().map(|v| (v.clone(), 1)).collect(),
            is_final: false,
        }
    }

    /// A container that already holds final values.
    pub fn finalized(best_value: f64, worst_value: f64) -> Self {
        Self {
            best_value,
            worst_value,
            counters: BTreeMap::new(),
            is_final: true,
        }
    }

    pub fn add_value(&mut self, best_value: f64, worst_value: f64, data_vars: &[String]) {
        self.add_value_without_increasing_counter(best_value, worst_value);
        for var in data_vars {
            *self.counters.entry(var.clone()).or_insert(0) += 1;
        }
    }

    pub fn add_value_without_increasing_counter(&mut self, best_value: f64, worst_value: f64) {
        self.best_value += best_value;
        self.worst_value += worst_value;
    }

    pub fn best_value(&self) -> f64 {
        self.best_value
    }

    pub fn worst_value(&self) -> f64 {
        self.worst_value
    }

    pub fn counter_of(&self, var: &str) -> usize {
        self.counters.get(var).copied().unwrap_or(0)
    }

    /// The contribution count shared by every data variable.
    pub fn sum_counter(&self) -> Result<usize> {
        let mut values = self.counters.values();
        let first = *values
            .next()
            .ok_or_else(|| anyhow!("Sum Counter is empty"))?;
        if values.any(|v| *v != first) {
            bail!(
                "Sums of data variables in CandidateContainer do not match: {:?}",
                self.counters
            );
        }
        Ok(first)
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Turns the sums into averages. Allowed once.
    pub fn set_as_final(&mut self) -> Result<()> {
        if self.is_final {
            bail!("CandidateContainer has already been set as final");
        }
        let counter = self.sum_counter()? as f64;
        self.best_value /= counter;
        self.worst_value /= counter;
        self.counters.clear();
        self.is_final = true;
        Ok(())
    }
}

/// One entry of the aggregated first-phase output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicResult {
    pub ts: String,
    pub value: HeuristicValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HeuristicValue {
    Similarity(f64),
    Interval { best: f64, worst: f64 },
}

impl HeuristicResult {
    pub fn value(&self) -> Result<f64> {
        match self.value {
            HeuristicValue::Similarity(value) => Ok(value),
            HeuristicValue::Interval { .. } => bail!("Value is not defined for {}", self.ts),
        }
    }

    pub fn interval(&self) -> Result<(f64, f64)> {
        match self.value {
            HeuristicValue::Interval { best, worst } => Ok((best, worst)),
            HeuristicValue::Similarity(_) => {
                bail!("best_value/worst_value are not defined for {}", self.ts)
            }
        }
    }
}

/// Per-request options. `None` means "use the full default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParameters {
    pub search_data_var: Option<Vec<String>>,
    pub dataset_selection_parameters: Option<Vec<DatasetSelectionParameter>>,
    pub ts_neighbour_gap: Option<i64>,
    pub search_hours: Option<Vec<u32>>,
    pub input_step_difference: Option<Vec<i64>>,
    pub selection_data_vars: Option<Vec<String>>,
}

impl RequestParameters {
    pub fn search_vars(&self) -> Result<&[String]> {
        self.search_data_var
            .as_deref()
            .ok_or_else(|| anyhow!("The search requires the data variables to be defined"))
    }

    pub fn search_hours(&self) -> Option<&[u32]> {
        self.search_hours.as_deref()
    }

    /// Variables used for candidate screening (defaults to the search variables).
    pub fn screening_vars(&self) -> Result<&[String]> {
        match self.selection_data_vars.as_deref() {
            Some(vars) => Ok(vars),
            None => self.search_vars(),
        }
    }
}
