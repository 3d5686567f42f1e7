//! The search service contract shared by every service variant.

use super::types::{CandidateResults, HeuristicResult, InputFiles, RequestParameters, SearchResults};
use crate::correlation::CorrelationFunction;
use crate::repository::RepositoryCollection;

use anyhow::{Result, bail};
use std::collections::BTreeMap;

/// Tracing target of the per-step timing events.
pub const TS_DEBUG_TARGET: &str = "ts_debug";

/// Computes similarity values of the local partition against a query.
///
/// Every search returns its results together with the number of contributions a
/// result needs before it is complete.
pub trait SearchService: Send + Sync {
    fn tag(&self) -> &'static str;

    fn repositories(&self) -> &RepositoryCollection;

    /// Slides the query over every instant of the local partition.
    ///
    /// Each query instant is compared against every partition instant and the value is
    /// accumulated under the key where the query would start.
    ///
    /// # Arguments
    /// * `input` - Query files per data variable, as received from the master.
    /// * `params` - Search variables, hours, step differences and selection of the request.
    /// * `function` - The correlation function that scores each pair of slices.
    /// * `num_results` - How many complete results to keep; ignored by the full scan.
    ///
    /// # Returns
    /// * `Ok((results, size))` with raw sums per start key; a result is complete once its
    ///   counter equals `size` (query instants times search variables).
    /// * `Err` if a variable has no input, the inputs disagree in size or a file cannot be read.
    fn execute_search(
        &self,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        num_results: Option<usize>,
    ) -> Result<(SearchResults, usize)>;

    /// Evaluates the query only around instants found by a previous (heuristic) phase.
    ///
    /// # Arguments
    /// * `heuristics` - Start keys of the first phase; each is widened by `ts_neighbour_gap`
    ///   steps on both sides.
    /// * `input` - Query files per data variable.
    /// * `params` - Request parameters; `ts_neighbour_gap` must be set and positive.
    /// * `function` - The correlation function that scores each pair of slices.
    /// * `num_results` - How many complete results to keep, for services that filter.
    ///
    /// # Returns
    /// * `Ok((results, size))` with one raw sum per refined start key.
    /// * `Err` if the neighbour gap is missing or not positive, or a search fails.
    fn execute_search_on_ts(
        &self,
        heuristics: &mut dyn Iterator<Item = HeuristicResult>,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        num_results: Option<usize>,
    ) -> Result<(SearchResults, usize)>;

    /// Bounded screening over the selection box of the request.
    #[allow(unused_variables)]
    fn execute_search_for_candidates(
        &self,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        num_results: Option<usize>,
    ) -> Result<(CandidateResults, usize)> {
        bail!("Service {} does not support candidate search", self.tag())
    }

    /// Whether controllers should screen a global candidate list first.
    fn uses_global_candidates(&self) -> bool {
        false
    }

    fn low_resolution_parameters(&self, data_var: &str) -> Result<BTreeMap<String, usize>> {
        self.repositories().low_resolution_parameters(data_var)
    }
}
