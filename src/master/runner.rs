//! Sequential execution of a requests file.

use super::client::NodeClient;
use super::merge::{MergeParameters, merge_results};
use super::report::{RunLog, write_csv};
use super::request::{build_request, request_id};
use super::types::SearchResult;
use crate::config::{MasterProperties, RequestDefinition, RequestsFile};
use crate::rpc::SearchRequest;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub struct Master {
    client: Arc<NodeClient>,
    results_path: PathBuf,
    dataset_interval: (i64, i64),
}

impl Master {
    pub fn new(properties: &MasterProperties) -> Result<Arc<Self>> {
        let dataset_interval = properties.dataset_interval()?;
        for node in &properties.node_properties {
            tracing::debug!("Worker node {}", node.address());
        }
        std::fs::create_dir_all(&properties.results_path)?;

        Ok(Arc::new(Self {
            client: NodeClient::new(properties.node_properties.clone()),
            results_path: properties.results_path.clone(),
            dataset_interval,
        }))
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// Runs every request in order and returns the path of the run log.
    ///
    /// A failed request is recorded in the log and does not stop the run.
    pub async fn run(&self, requests: &RequestsFile) -> Result<PathBuf> {
        let mut log = RunLog::create(&self.results_path, chrono::Local::now().naive_local())?;
        tracing::debug!("Starting {} requests", requests.requests.len());

        for definition in &requests.requests {
            let id = request_id(&definition.request_name, chrono::Local::now().naive_local());
            let request = match build_request(definition, &id) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!("Request {} could not be built: {:#}", id, e);
                    log.error(&e)?;
                    log.separator()?;
                    continue;
                }
            };
            log.request(&request)?;

            let started = Instant::now();
            match self.execute(definition, &request).await {
                Ok(result) => {
                    log.result(started.elapsed().as_nanos(), &result)?;
                    let csv = write_csv(&self.results_path, &request.request_id, &result)?;
                    tracing::info!(
                        "Request {} finished with success, results in {}",
                        request.request_id,
                        csv.display()
                    );
                }
                Err(e) => {
                    log.error(&e)?;
                    tracing::warn!("Request {} finished with an exception", request.request_id);
                    tracing::debug!("{:?}", e);
                }
            }
            log.separator()?;
        }

        Ok(log.path().to_path_buf())
    }

    /// One request across all workers, merged.
    pub async fn execute(
        &self,
        definition: &RequestDefinition,
        request: &SearchRequest,
    ) -> Result<SearchResult> {
        let outcomes = self.client.search_request(request).await?;
        tracing::info!("Merging final results of {}", request.request_id);
        merge_results(
            &outcomes,
            &MergeParameters {
                dataset_start: self.dataset_interval.0,
                dataset_end: self.dataset_interval.1,
                time_instances: definition.time_instances,
                search_vars: definition.options.data_vars.len(),
                number_of_results: definition.number_of_results,
            },
        )
    }
}
