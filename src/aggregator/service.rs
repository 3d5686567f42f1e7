//! Cross-node merge of first-phase results and candidates.

use super::types::{AggregationError, CandidatesAggregate, ResultsAggregate};
use crate::queue::{CandidateEntry, CandidatesMessage, MessageKey, ResultEntry, ResultsMessage};

use anyhow::Result;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Holds one aggregate per request id until every expected node reported.
pub struct AggregationService {
    node_ids: HashSet<String>,
    results: DashMap<String, ResultsAggregate>,
    candidates: DashMap<String, CandidatesAggregate>,
}

impl AggregationService {
    pub fn new(node_ids: &[String]) -> Arc<Self> {
        Arc::new(Self {
            node_ids: node_ids.iter().cloned().collect(),
            results: DashMap::new(),
            candidates: DashMap::new(),
        })
    }

    pub fn expected_nodes(&self) -> usize {
        self.node_ids.len()
    }

    pub fn pending_requests(&self) -> usize {
        self.results.len() + self.candidates.len()
    }

    fn check_node(&self, key: &MessageKey) -> Result<()> {
        if !self.node_ids.contains(&key.node_id) {
            return Err(AggregationError::UnknownNode {
                request_id: key.request_id.clone(),
                node_id: key.node_id.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Returns the merged top results once the last node reported.
    pub fn process_results_message(
        &self,
        key: &MessageKey,
        message: ResultsMessage,
    ) -> Result<Option<Vec<ResultEntry>>> {
        tracing::info!(
            "Received a results message of size {} from node {} for request {}",
            message.final_results.len(),
            key.node_id,
            key.request_id
        );
        self.check_node(key)?;

        let num_results = message.num_results;
        let is_reverse_order = message.is_reverse_order;
        let complete = {
            let mut aggregate = self
                .results
                .entry(key.request_id.clone())
                .or_insert_with(|| ResultsAggregate::new(message.size_input));
            if aggregate.has_node(&key.node_id) {
                return Err(AggregationError::DuplicateMessage {
                    request_id: key.request_id.clone(),
                    node_id: key.node_id.clone(),
                }
                .into());
            }
            aggregate.add_message(&key.node_id, message);
            aggregate.node_count() == self.node_ids.len()
        };

        if !complete {
            return Ok(None);
        }
        Ok(self.results.remove(&key.request_id).map(|(_, aggregate)| {
            if aggregate.pending_partials() > 0 {
                tracing::debug!(
                    "Request {} left {} incomplete results",
                    key.request_id,
                    aggregate.pending_partials()
                );
            }
            aggregate.merged(num_results, is_reverse_order)
        }))
    }

    /// Returns the merged and pruned candidate list once the last node reported.
    pub fn process_candidates_message(
        &self,
        key: &MessageKey,
        message: CandidatesMessage,
    ) -> Result<Option<Vec<CandidateEntry>>> {
        tracing::info!(
            "Received a candidates message of size {} from node {} for request {}",
            message.final_results.len(),
            key.node_id,
            key.request_id
        );
        self.check_node(key)?;

        let complete = {
            let mut aggregate = self
                .candidates
                .entry(key.request_id.clone())
                .or_insert_with(|| {
                    CandidatesAggregate::new(
                        message.size_input,
                        message.num_results,
                        message.is_reverse_order,
                    )
                });
            if aggregate.has_node(&key.node_id) {
                return Err(AggregationError::DuplicateMessage {
                    request_id: key.request_id.clone(),
                    node_id: key.node_id.clone(),
                }
                .into());
            }
            aggregate.add_message(&key.node_id, message);
            aggregate.node_count() == self.node_ids.len()
        };

        if !complete {
            return Ok(None);
        }
        Ok(self
            .candidates
            .remove(&key.request_id)
            .map(|(_, aggregate)| aggregate.merged()))
    }
}
