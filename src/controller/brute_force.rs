//! Single-phase controller: every worker scans its whole partition and answers directly.

use super::intake::{blocking, cleanup, error_cleanup, receive_inputs};
use super::parameters::{
    analogues_from_results, default_search_vars, list_of_files_factory,
    request_parameters_factory, requested_results, separate_files_by_data_vars,
};
use super::types::{ControllerState, StateTrace};
use crate::registry::ComponentRegistry;
use crate::rpc::{ResponseSender, SearchController, SearchRequest, SearchResponse};
use crate::service::{SearchService, TS_DEBUG_TARGET};
use crate::transfer::FileProtocol;

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub struct BruteForceController {
    file_protocol: Arc<FileProtocol>,
    service: Arc<dyn SearchService>,
    registry: Arc<ComponentRegistry>,
    delete_input_files: bool,
}

impl BruteForceController {
    pub fn new(
        file_protocol: Arc<FileProtocol>,
        service: Arc<dyn SearchService>,
        registry: Arc<ComponentRegistry>,
        delete_input_files: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            file_protocol,
            service,
            registry,
            delete_input_files,
        })
    }

    /// Serves one request with a single full-resolution search.
    ///
    /// # Arguments
    /// * `request` - The search request sent by the master.
    /// * `responses` - Stream back to the master (port map, then analogues).
    /// * `trace` - Records every state the request goes through.
    ///
    /// # Returns
    /// * `Ok(())` once the analogues were sent.
    /// * `Err` if the transfer, the search or the response failed.
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
        let received_paths: Vec<PathBuf> = received.iter().map(|(path, _)| path.clone()).collect();
        tracing::info!(
            "Files have been transferred, executing search for request id {}",
            request.request_id
        );

        let input = separate_files_by_data_vars(&received);
        default_search_vars(&mut params, &input);
        let service = self.service.clone();
        let search_function = function.clone();
        let num_results = requested_results(&request);

        let searched = blocking(move || {
            tracing::debug!(target: TS_DEBUG_TARGET, "STARTING SEARCH ON DATASET");
            let outcome =
                service.execute_search(&input, &params, search_function.as_ref(), num_results);
            tracing::debug!(target: TS_DEBUG_TARGET, "ENDED SEARCH ON DATASET");
            outcome
        })
        .await;

        let results = match searched {
            Ok((results, _)) => results,
            Err(e) => {
                error_cleanup(&received_paths, trace, &e).await;
                return Err(e);
            }
        };

        trace.enter(ControllerState::Respond);
        tracing::info!("Search finished, sending results of request id {}", request.request_id);
        let sent = responses
            .send(SearchResponse::Analogues {
                analogues: analogues_from_results(&results),
                reverse_sort_order_corr_function: function.is_reverse_order(),
            })
            .await;

        if self.delete_input_files {
            cleanup(&received_paths, trace).await;
        }
        sent?;
        tracing::info!("Search finished for request id {}", request.request_id);
        Ok(())
    }
}

#[async_trait]
impl SearchController for BruteForceController {
    async fn search(&self, request: SearchRequest, responses: ResponseSender) -> Result<()> {
        let mut trace = StateTrace::new(&request.request_id);
        self.run(request, &responses, &mut trace).await
    }
}
