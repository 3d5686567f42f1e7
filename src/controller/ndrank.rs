//! Two-phase controller.
//!
//! A cheap first phase (low-resolution search, full-resolution search or candidate
//! screening) is merged across workers through the message queue, and the merged list
//! drives a full-resolution refinement around the best instants.

use super::intake::{blocking, cleanup, error_cleanup, receive_inputs};
use super::parameters::{
    analogues_from_results, default_search_vars, list_of_files_factory,
    request_parameters_factory, requested_results, separate_files_by_data_vars,
};
use super::reduction::reduce_resolution;
use super::types::{ControllerState, StateTrace};
use crate::correlation::CorrelationFunction;
use crate::queue::{QueueClient, candidates_message, results_message};
use crate::registry::ComponentRegistry;
use crate::rpc::{ResponseSender, SearchController, SearchRequest, SearchResponse};
use crate::service::{
    HeuristicResult, InputFiles, RequestParameters, SearchResults, SearchService, TS_DEBUG_TARGET,
};
use crate::transfer::FileProtocol;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What one request works with once its inputs are on disk.
struct Job {
    request_id: String,
    number_of_results: usize,
    num_results: Option<usize>,
    function: Arc<dyn CorrelationFunction>,
    params: RequestParameters,
    input: InputFiles,
}

pub struct NdrankController {
    file_protocol: Arc<FileProtocol>,
    full_resolution_service: Arc<dyn SearchService>,
    low_resolution_service: Option<Arc<dyn SearchService>>,
    queue: Arc<QueueClient>,
    registry: Arc<ComponentRegistry>,
    temporary_folder: PathBuf,
    delete_input_files: bool,
}

impl NdrankController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_protocol: Arc<FileProtocol>,
        full_resolution_service: Arc<dyn SearchService>,
        low_resolution_service: Option<Arc<dyn SearchService>>,
        queue: Arc<QueueClient>,
        registry: Arc<ComponentRegistry>,
        temporary_folder: &Path,
        delete_input_files: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            file_protocol,
            full_resolution_service,
            low_resolution_service,
            queue,
            registry,
            temporary_folder: temporary_folder.to_path_buf(),
            delete_input_files,
        })
    }

    /// Serves one request from port mapping to the final analogues.
    ///
    /// # Arguments
    /// * `request` - The search request sent by the master.
    /// * `responses` - Stream back to the master (port map, then analogues).
    /// * `trace` - Records every state the request goes through.
    ///
    /// # Returns
    /// * `Ok(())` once the analogues were sent.
    /// * `Err` if the transfer, either phase or the response failed. Files created for the
    ///   request are removed when a phase fails.
    pub(crate) async fn run(
        &self,
        request: SearchRequest,
        responses: &ResponseSender,
        trace: &mut StateTrace,
    ) -> Result<()> {
        let function = self.registry.correlation(&request.correlation_function)?;
        let mut params = request_parameters_factory(&request.options)?;
        tracing::info!("Received a new request with id {}, mapping ports", request.request_id);

        let received = receive_inputs(
            &self.file_protocol,
            list_of_files_factory(&request.input_files),
            responses,
            trace,
        )
        .await?;
        let mut created: Vec<PathBuf> = received.iter().map(|(path, _)| path.clone()).collect();
        tracing::info!(
            "Files have been transferred, executing search for request id {}",
            request.request_id
        );

        let input = separate_files_by_data_vars(&received);
        default_search_vars(&mut params, &input);
        let job = Job {
            request_id: request.request_id.clone(),
            number_of_results: request.number_of_results,
            num_results: requested_results(&request),
            function,
            params,
            input,
        };

        let results = match self.execute(&job, &mut created, trace).await {
            Ok(results) => results,
            Err(e) => {
                error_cleanup(&created, trace, &e).await;
                return Err(e);
            }
        };

        trace.enter(ControllerState::Respond);
        tracing::info!("Search finished, sending results of request id {}", job.request_id);
        let sent = responses
            .send(SearchResponse::Analogues {
                analogues: analogues_from_results(&results),
                reverse_sort_order_corr_function: job.function.is_reverse_order(),
            })
            .await;

        if self.delete_input_files {
            cleanup(&created, trace).await;
        }
        sent?;
        tracing::info!("Search finished for request id {}", job.request_id);
        Ok(())
    }

    /// Both phases. Reduced files written on the way are appended to `created`.
    ///
    /// The first phase runs on the low-resolution service when there is one, otherwise on
    /// the full-resolution service. Its output is merged across workers through the
    /// aggregator and then refined at full resolution.
    ///
    /// # Arguments
    /// * `job` - The request with its correlation function, parameters and input files.
    /// * `created` - Files to remove once the request ends.
    /// * `trace` - Records every state the request goes through.
    ///
    /// # Returns
    /// * `Ok(results)` with the refined raw sums.
    /// * `Err` if a search, the exchange with the aggregator or the reduction failed.
    async fn execute(
        &self,
        job: &Job,
        created: &mut Vec<PathBuf>,
        trace: &mut StateTrace,
    ) -> Result<SearchResults> {
        let full = self.full_resolution_service.clone();

        let (heuristic, size_input) = match &self.low_resolution_service {
            // Screening is the first phase: nothing else is published or awaited.
            None if full.uses_global_candidates() => {
                return self.process_candidates(job, trace).await;
            }
            None => {
                trace.enter(ControllerState::LowResSearch);
                self.run_search(full.clone(), job, job.input.clone()).await?
            }
            Some(low) => {
                trace.enter(ControllerState::ReducingResolution);
                tracing::info!("Reducing the resolution of the input");
                let reduced = self.reduce(low.clone(), &job.input).await?;
                created.extend(reduced.values().flatten().cloned());

                trace.enter(ControllerState::LowResSearch);
                let outcome = self.run_search(low.clone(), job, reduced).await?;
                tracing::info!(
                    "Search finished in low resolution dataset for request id {}",
                    job.request_id
                );
                outcome
            }
        };

        trace.enter(ControllerState::PublishPartial);
        let message = results_message(
            &heuristic,
            size_input,
            job.number_of_results,
            job.function.is_reverse_order(),
        );
        self.queue.submit_results(&job.request_id, &message).await?;

        if full.uses_global_candidates() {
            return self.process_candidates(job, trace).await;
        }

        trace.enter(ControllerState::AwaitAggregate);
        tracing::info!("Waiting for the aggregated results of request id {}", job.request_id);
        let heuristics = self.queue.get_results(&job.request_id).await?;

        trace.enter(ControllerState::FullResRefineOrCandidates);
        self.refine(full, job, heuristics).await
    }

    /// Screens candidates, merges them across workers and refines the merged list.
    async fn process_candidates(&self, job: &Job, trace: &mut StateTrace) -> Result<SearchResults> {
        trace.enter(ControllerState::FullResRefineOrCandidates);
        tracing::debug!("Searching for candidates");
        let service = self.full_resolution_service.clone();
        let function = job.function.clone();
        let (input, params, num_results) = (job.input.clone(), job.params.clone(), job.num_results);
        let (candidates, size_input) = blocking(move || {
            service.execute_search_for_candidates(&input, &params, function.as_ref(), num_results)
        })
        .await?;

        trace.enter(ControllerState::PublishFinalPartial);
        let message = candidates_message(
            &candidates,
            size_input,
            job.number_of_results,
            job.function.is_reverse_order(),
        )?;
        self.queue.submit_candidates(&job.request_id, &message).await?;

        trace.enter(ControllerState::AwaitFinalAggregate);
        let merged = self.queue.get_candidates(&job.request_id).await?;

        trace.enter(ControllerState::FullResRefineOrCandidates);
        self.refine(self.full_resolution_service.clone(), job, merged).await
    }

    async fn run_search(
        &self,
        service: Arc<dyn SearchService>,
        job: &Job,
        input: InputFiles,
    ) -> Result<(SearchResults, usize)> {
        let function = job.function.clone();
        let (params, num_results) = (job.params.clone(), job.num_results);
        blocking(move || {
            tracing::debug!(target: TS_DEBUG_TARGET, "STARTING SEARCH ON DATASET");
            let outcome = service.execute_search(&input, &params, function.as_ref(), num_results);
            tracing::debug!(target: TS_DEBUG_TARGET, "ENDED SEARCH ON DATASET");
            outcome
        })
        .await
    }

    async fn refine(
        &self,
        service: Arc<dyn SearchService>,
        job: &Job,
        heuristics: Vec<HeuristicResult>,
    ) -> Result<SearchResults> {
        tracing::debug!("Refining {} heuristic instants", heuristics.len());
        let function = job.function.clone();
        let (input, params, num_results) = (job.input.clone(), job.params.clone(), job.num_results);
        let (results, _) = blocking(move || {
            tracing::debug!(target: TS_DEBUG_TARGET, "STARTING REFINEMENT");
            let outcome = service.execute_search_on_ts(
                &mut heuristics.into_iter(),
                &input,
                &params,
                function.as_ref(),
                num_results,
            );
            tracing::debug!(target: TS_DEBUG_TARGET, "ENDED REFINEMENT");
            outcome
        })
        .await?;
        Ok(results)
    }

    async fn reduce(&self, low: Arc<dyn SearchService>, input: &InputFiles) -> Result<InputFiles> {
        let store = self.registry.store();
        let input = input.clone();
        let folder = self.temporary_folder.clone();
        blocking(move || {
            reduce_resolution(
                store.as_ref(),
                &input,
                &|var| low.low_resolution_parameters(var),
                &folder,
            )
        })
        .await
    }
}

#[async_trait]
impl SearchController for NdrankController {
    async fn search(&self, request: SearchRequest, responses: ResponseSender) -> Result<()> {
        let mut trace = StateTrace::new(&request.request_id);
        self.run(request, &responses, &mut trace).await
    }
}
