//! Services that only report the best N complete results.

use super::brute_force::BruteForceService;
use super::layer::SearchService;
use super::types::{
    CandidateResults, HeuristicResult, InputFiles, RequestParameters, ResultContainer,
    SearchResults,
};
use crate::correlation::CorrelationFunction;
use crate::repository::RepositoryCollection;

use anyhow::{Result, anyhow};

pub const TOP_N_SERVICE: &str = "top-n";
pub const CANDIDATES_SERVICE: &str = "candidates";

fn required_results(num_results: Option<usize>) -> Result<usize> {
    num_results
        .filter(|n| *n > 0)
        .ok_or_else(|| anyhow!("Number of results must be a positive number"))
}

/// Keeps every partial result and the `num_results` best complete ones.
pub fn filter_top_n(
    results: SearchResults,
    size_input: usize,
    num_results: usize,
    function: &dyn CorrelationFunction,
) -> SearchResults {
    let mut totals: Vec<(i64, ResultContainer)> = Vec::with_capacity(num_results + 1);
    let mut filtered = SearchResults::new();

    for (key, result) in results {
        if result.sum_counter < size_input {
            filtered.insert(key, result);
            continue;
        }
        let accept = match totals.last() {
            None => true,
            Some((_, worst)) => {
                totals.len() < num_results || function.compare(worst.average(), result.average())
            }
        };
        if !accept {
            continue;
        }
        if totals.len() >= num_results {
            totals.pop();
        }
        totals.push((key, result));
        for i in (1..totals.len()).rev() {
            if function.compare(totals[i - 1].1.average(), totals[i].1.average()) {
                totals.swap(i - 1, i);
            } else {
                break;
            }
        }
    }

    filtered.extend(totals);
    filtered
}

pub struct TopNService {
    base: BruteForceService,
}

impl TopNService {
    pub fn new(base: BruteForceService) -> Self {
        Self { base }
    }

    pub(crate) fn base(&self) -> &BruteForceService {
        &self.base
    }
}

impl SearchService for TopNService {
    fn tag(&self) -> &'static str {
        TOP_N_SERVICE
    }

    fn repositories(&self) -> &RepositoryCollection {
        self.base.repositories()
    }

    fn execute_search(
        &self,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        num_results: Option<usize>,
    ) -> Result<(SearchResults, usize)> {
        let num_results = required_results(num_results)?;
        let (results, size_input) = self.base.execute_search(input, params, function, None)?;
        Ok((
            filter_top_n(results, size_input, num_results, function),
            size_input,
        ))
    }

    fn execute_search_on_ts(
        &self,
        heuristics: &mut dyn Iterator<Item = HeuristicResult>,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        num_results: Option<usize>,
    ) -> Result<(SearchResults, usize)> {
        let num_results = required_results(num_results)?;
        let (results, size_input) =
            self.base
                .execute_search_on_ts(heuristics, input, params, function, None)?;
        Ok((
            filter_top_n(results, size_input, num_results, function),
            size_input,
        ))
    }
}

/// Top-N service that screens a global candidate list before refinement.
pub struct CandidateService {
    inner: TopNService,
}

impl CandidateService {
    pub fn new(base: BruteForceService) -> Self {
        Self {
            inner: TopNService::new(base),
        }
    }
}

impl SearchService for CandidateService {
    fn tag(&self) -> &'static str {
        CANDIDATES_SERVICE
    }

    fn repositories(&self) -> &RepositoryCollection {
        self.inner.repositories()
    }

    fn execute_search(
        &self,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        num_results: Option<usize>,
    ) -> Result<(SearchResults, usize)> {
        self.inner.execute_search(input, params, function, num_results)
    }

    fn execute_search_on_ts(
        &self,
        heuristics: &mut dyn Iterator<Item = HeuristicResult>,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        num_results: Option<usize>,
    ) -> Result<(SearchResults, usize)> {
        self.inner
            .execute_search_on_ts(heuristics, input, params, function, num_results)
    }

    fn execute_search_for_candidates(
        &self,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        num_results: Option<usize>,
    ) -> Result<(CandidateResults, usize)> {
        self.inner
            .base()
            .screen_candidates(input, params, function, num_results)
    }

    fn uses_global_candidates(&self) -> bool {
        true
    }
}
