//! Sequential search over the whole local partition.

use super::candidates::CandidateListManager;
use super::input::InputIterator;
use super::layer::{SearchService, TS_DEBUG_TARGET};
use super::types::{
    CandidateContainer, CandidateResults, HeuristicResult, InputFiles, RequestParameters,
    ResultContainer, SearchResults,
};
use crate::array::time::{format_key, parse_key};
use crate::array::{ArrayStore, DatasetFile, DatasetSelectionParameter};
use crate::correlation::{CorrelationFunction, StatisticsCollection, TimeSlice};
use crate::repository::{DateContainer, RepositoryCollection};

use anyhow::{Result, anyhow, bail};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub const BRUTE_FORCE_SERVICE: &str = "brute-force";

/// Longest run of consecutive gap instants a key walk may cross.
const MAX_GAP_WALK: usize = 100_000;

type Screening<'a> = (&'a dyn CorrelationFunction, &'a [DatasetSelectionParameter]);

pub struct BruteForceService {
    repositories: RepositoryCollection,
    store: Arc<dyn ArrayStore>,
}

impl BruteForceService {
    pub fn new(repositories: RepositoryCollection, store: Arc<dyn ArrayStore>) -> Self {
        Self {
            repositories,
            store,
        }
    }

    /// Opens the query files of every variable in `vars`. All variables must hold the
    /// same number of valid instants.
    fn open_inputs(
        &self,
        input: &InputFiles,
        vars: &[String],
        params: &RequestParameters,
        screening: Option<Screening<'_>>,
    ) -> Result<(BTreeMap<String, InputIterator>, usize)> {
        tracing::info!("Opening input files");
        let mut iterators = BTreeMap::new();
        let mut input_size: Option<usize> = None;

        for var in vars {
            let paths = input
                .get(var)
                .ok_or_else(|| anyhow!("No input files were received for data variable {}", var))?;
            let files = paths
                .iter()
                .map(|path| self.store.open(path))
                .collect::<Result<Vec<DatasetFile>>>()?;
            let metadata = self.repositories.metadata_by_data_var(var)?;
            let intervals = params.input_step_difference.clone();

            let iterator = match screening {
                Some((function, selection)) => InputIterator::with_statistics(
                    &files, var, metadata, vars, intervals, function, selection,
                )?,
                None => InputIterator::new(&files, var, metadata, vars, intervals)?,
            };

            match input_size {
                None => input_size = Some(iterator.size()),
                Some(size) if size != iterator.size() => {
                    bail!("One of the inputs has a different size")
                }
                Some(_) => {}
            }
            iterators.insert(var.clone(), iterator);
        }

        match input_size {
            Some(0) => bail!("The input holds no valid time instances"),
            Some(size) => Ok((iterators, size)),
            None => bail!("There must be at least one input list"),
        }
    }

    /// First instant at or beyond `instant` (moving by `delta`) that is not a gap.
    fn skip_gaps(
        subset: &RepositoryCollection,
        mut instant: i64,
        delta: i64,
        vars: &[String],
        hours: Option<&[u32]>,
    ) -> Result<i64> {
        let mut walked = 0;
        while subset.is_gap(instant, vars, hours) {
            walked += 1;
            if walked > MAX_GAP_WALK {
                bail!("No valid instant found near {}", format_key(instant));
            }
            instant += delta;
        }
        Ok(instant)
    }

    fn step_of(subset: &RepositoryCollection) -> Result<i64> {
        let step = subset.step_variation();
        if step <= 0 {
            bail!("Repository step must be positive, found {}", step);
        }
        Ok(step)
    }

    fn accumulate(results: &mut SearchResults, key: i64, value: f64) {
        match results.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(ResultContainer::new(value));
            }
            Entry::Occupied(mut entry) => entry.get_mut().add_value(value),
        }
    }

    /// Screens the partition over the selection box, ranking complete candidates.
    ///
    /// Only the selected cells are compared. Full-slice statistics turn each comparison into
    /// a (best, worst) bound, and complete candidates that cannot reach the top
    /// `num_results` are pruned.
    ///
    /// # Arguments
    /// * `input` - Query files per data variable.
    /// * `params` - Request parameters; `dataset_selection_parameters` must be set.
    /// * `function` - A correlation function that supports partial values.
    /// * `num_results` - Size of the kept candidate list; must be positive.
    ///
    /// # Returns
    /// * `Ok((candidates, size))` holding the surviving complete candidates plus every partial
    ///   one, and the number of query instants.
    /// * `Err` if the selection or the result count is missing, or the function has no bound.
    pub(crate) fn screen_candidates(
        &self,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        num_results: Option<usize>,
    ) -> Result<(CandidateResults, usize)> {
        let selection = params
            .dataset_selection_parameters
            .as_deref()
            .ok_or_else(|| anyhow!("Candidate search requires dataset selection parameters"))?;
        let top_res = num_results
            .filter(|n| *n > 0)
            .ok_or_else(|| anyhow!("Number of results must be a positive number"))?;
        let vars = params.screening_vars()?;
        let hours = params.search_hours();
        let subset = self.repositories.subset(vars)?;
        let step = Self::step_of(&subset)?;
        let (inputs, input_size) =
            self.open_inputs(input, vars, params, Some((function, selection)))?;
        let var_count = vars.len() as f64;

        let mut statistics = StatisticsCollection::new();
        let mut candidates = CandidateResults::new();

        for repository in subset.repositories() {
            let metadata = repository.metadata();
            for entry in repository.dataset()? {
                let (path, file) = entry?;
                tracing::info!("Screening file {}", path.display());

                for (position, instant) in file.timestamps().into_iter().enumerate() {
                    if subset.is_gap(instant, vars, hours) {
                        continue;
                    }
                    for var in vars.iter().filter(|v| metadata.has_data_var(v)) {
                        let full = TimeSlice::new(instant, file.step_slice(var, position)?);
                        let dataset_stats = statistics.get_or_insert(function, var, &full)?;
                        let selected = TimeSlice::new(instant, file.select_box(&full.grid, selection)?);
                        let counted = std::slice::from_ref(var);

                        let mut key = instant;
                        for (query, query_stats, interval) in inputs[var].iterate_with_statistics() {
                            key -= step * interval;
                            let (best, worst) = function.calculate_partial_value(
                                query,
                                &selected,
                                query_stats,
                                &dataset_stats,
                                selection,
                                var,
                            )?;
                            let (best, worst) = (best / var_count, worst / var_count);
                            match candidates.entry(key) {
                                Entry::Vacant(entry) => {
                                    entry.insert(CandidateContainer::new(best, worst, counted));
                                }
                                Entry::Occupied(mut entry) => {
                                    entry.get_mut().add_value(best, worst, counted)
                                }
                            }
                            key = Self::skip_gaps(&subset, key - step, -step, vars, hours)?;
                        }
                    }
                    // Each instant is visited once.
                    statistics.remove_instant(instant);
                }
            }
        }

        let mut manager = CandidateListManager::new(function, top_res);
        let mut partials = CandidateResults::new();
        for (key, mut candidate) in candidates {
            if vars.iter().all(|v| candidate.counter_of(v) == input_size) {
                candidate.set_as_final()?;
                manager.add_value(key, candidate);
            } else {
                partials.insert(key, candidate);
            }
        }
        tracing::info!(
            "Candidate screening kept {} complete and {} partial candidates",
            manager.len(),
            partials.len()
        );

        let mut results = manager.into_results();
        results.extend(partials);
        Ok((results, input_size))
    }
}

impl SearchService for BruteForceService {
    fn tag(&self) -> &'static str {
        BRUTE_FORCE_SERVICE
    }

    fn repositories(&self) -> &RepositoryCollection {
        &self.repositories
    }

    fn execute_search(
        &self,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        _num_results: Option<usize>,
    ) -> Result<(SearchResults, usize)> {
        let vars = params.search_vars()?;
        let hours = params.search_hours();
        let subset = self.repositories.subset(vars)?;
        let step = Self::step_of(&subset)?;
        let (inputs, input_size) = self.open_inputs(input, vars, params, None)?;
        let mut results = SearchResults::new();

        for repository in subset.repositories() {
            let metadata = repository.metadata();
            for entry in repository.dataset()? {
                let (path, file) = entry?;
                tracing::info!("Searching file {}", path.display());

                for (position, instant) in file.timestamps().into_iter().enumerate() {
                    tracing::debug!(target: TS_DEBUG_TARGET, "START OF SINGLE STEP");
                    if subset.is_gap(instant, vars, hours) {
                        tracing::debug!("Skipping {}", format_key(instant));
                        continue;
                    }
                    for var in vars.iter().filter(|v| metadata.has_data_var(v)) {
                        tracing::debug!(target: TS_DEBUG_TARGET, "START SELECT OF STEP");
                        let section = TimeSlice::new(instant, file.step_slice(var, position)?);
                        tracing::debug!(target: TS_DEBUG_TARGET, "END SELECT OF STEP");

                        let mut key = instant;
                        for (query, interval) in inputs[var].iterate() {
                            key -= step * interval;
                            tracing::debug!(target: TS_DEBUG_TARGET, "START CORRELATION");
                            let value = function.calculate(query, &section, var)?;
                            tracing::debug!(target: TS_DEBUG_TARGET, "END CORRELATION");
                            Self::accumulate(&mut results, key, value);
                            key = Self::skip_gaps(&subset, key - step, -step, vars, hours)?;
                        }
                    }
                    tracing::debug!(target: TS_DEBUG_TARGET, "END OF SINGLE STEP");
                }
            }
        }

        Ok((results, input_size * vars.len()))
    }

    fn execute_search_on_ts(
        &self,
        heuristics: &mut dyn Iterator<Item = HeuristicResult>,
        input: &InputFiles,
        params: &RequestParameters,
        function: &dyn CorrelationFunction,
        _num_results: Option<usize>,
    ) -> Result<(SearchResults, usize)> {
        let gap = params.ts_neighbour_gap.ok_or_else(|| {
            anyhow!("Search on timestamps requires the ts_neighbour_gap to be defined")
        })?;
        if gap <= 0 {
            bail!("ts_neighbour_gap has to be a positive number");
        }
        let vars = params.search_vars()?;
        let hours = params.search_hours();
        let subset = self.repositories.subset(vars)?;
        let step = Self::step_of(&subset)?;
        let (inputs, input_size) = self.open_inputs(input, vars, params, None)?;
        tracing::debug!("Size of neighbourhood: {}", gap);

        let mut searched: HashMap<&str, HashSet<i64>> = HashMap::new();
        let mut results = SearchResults::new();

        for heuristic in heuristics {
            let center = parse_key(&heuristic.ts)?;
            for var in vars {
                let repository = subset.repository_by_data_var(var)?;
                let iterator = &inputs[var];
                let already_searched = searched.entry(var.as_str()).or_default();

                for i in (1 - gap)..gap {
                    let neighbour = center + step * i;
                    if already_searched.contains(&neighbour) || subset.is_gap(neighbour, vars, hours)
                    {
                        continue;
                    }
                    already_searched.insert(neighbour);

                    // Instants the query maps onto when it starts at `neighbour`.
                    let mut dates = Vec::with_capacity(iterator.size());
                    let mut date = neighbour;
                    for (_, interval) in iterator.iterate() {
                        date = Self::skip_gaps(&subset, date + step * interval, step, vars, hours)?;
                        dates.push(date);
                        date += step;
                    }

                    for (date, (query, _)) in dates.into_iter().zip(iterator.iterate()) {
                        let Some((_, file)) =
                            repository.dataset_part(DateContainer::from_instant(date))?
                        else {
                            tracing::info!("File not found, continuing...");
                            continue;
                        };
                        let Some(position) = file.position_of(date) else {
                            tracing::debug!("Instant {} not present in its file", format_key(date));
                            continue;
                        };
                        let section = TimeSlice::new(date, file.step_slice(var, position)?);
                        let value = function.calculate(query, &section, var)?;
                        Self::accumulate(&mut results, neighbour, value);
                    }
                }
            }
        }

        Ok((results, input_size * vars.len()))
    }
}
