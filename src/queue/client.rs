//! Worker side of the queue round trip: publish partial output, wait for the merge.

use super::broker::MessageBroker;
use super::types::*;
use crate::array::time::format_key;
use crate::service::{CandidateResults, HeuristicResult, HeuristicValue, SearchResults};

use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_AGGREGATE_TIMEOUT: Duration = Duration::from_secs(600);

/// Splits search results into final averages and partial sums.
///
/// A result is final once it holds `size_input` contributions.
pub fn results_message(
    results: &SearchResults,
    size_input: usize,
    num_results: usize,
    is_reverse_order: bool,
) -> ResultsMessage {
    let mut final_results = Vec::new();
    let mut partial_results = Vec::new();

    for (instant, container) in results {
        if container.sum_counter == size_input {
            final_results.push(ResultEntry {
                timestamp: format_key(*instant),
                value: container.average(),
            });
        } else {
            partial_results.push(PartialResultEntry {
                timestamp: format_key(*instant),
                value: container.value,
                sum_counter: container.sum_counter,
            });
        }
    }

    ResultsMessage {
        final_results,
        partial_results,
        size_input,
        num_results,
        is_reverse_order,
    }
}

/// Splits candidates into final bounds and partial bound sums.
pub fn candidates_message(
    candidates: &CandidateResults,
    size_input: usize,
    num_results: usize,
    is_reverse_order: bool,
) -> Result<CandidatesMessage> {
    let mut final_results = Vec::new();
    let mut partial_results = Vec::new();

    for (instant, container) in candidates {
        if container.is_final() {
            final_results.push(CandidateEntry {
                timestamp: format_key(*instant),
                best_value: container.best_value(),
                worst_value: container.worst_value(),
            });
        } else {
            partial_results.push(PartialCandidateEntry {
                timestamp: format_key(*instant),
                best_value: container.best_value(),
                worst_value: container.worst_value(),
                sum_counter: container.sum_counter()?,
            });
        }
    }

    Ok(CandidatesMessage {
        final_results,
        partial_results,
        size_input,
        num_results,
        is_reverse_order,
    })
}

pub struct QueueClient {
    broker: Arc<dyn MessageBroker>,
    node_id: String,
    timeout: Duration,
}

impl QueueClient {
    pub fn new(broker: Arc<dyn MessageBroker>, node_id: &str) -> Self {
        Self {
            broker,
            node_id: node_id.to_string(),
            timeout: DEFAULT_AGGREGATE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    fn key(&self, request_id: &str) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(MessageKey {
            request_id: request_id.to_string(),
            node_id: self.node_id.clone(),
        })?)
    }

    pub async fn submit_results(&self, request_id: &str, message: &ResultsMessage) -> Result<()> {
        tracing::debug!("Producing message for request id: {}", request_id);
        self.broker
            .publish(NEW_REQUESTS_TOPIC, self.key(request_id)?, serde_json::to_value(message)?)
            .await?;
        tracing::debug!("Message produced for request id: {}", request_id);
        Ok(())
    }

    pub async fn submit_candidates(&self, request_id: &str, message: &CandidatesMessage) -> Result<()> {
        tracing::debug!("Producing candidates message for request id: {}", request_id);
        self.broker
            .publish(NEW_CANDIDATES_TOPIC, self.key(request_id)?, serde_json::to_value(message)?)
            .await?;
        tracing::debug!("Candidates message produced for request id: {}", request_id);
        Ok(())
    }

    /// Waits for the merged results of `request_id`.
    pub async fn get_results(&self, request_id: &str) -> Result<Vec<HeuristicResult>> {
        let record = self.wait_for(request_id).await?;
        let entries: Vec<ResultEntry> = record.decode_value()?;
        Ok(entries
            .into_iter()
            .map(|entry| HeuristicResult {
                ts: entry.timestamp,
                value: HeuristicValue::Similarity(entry.value),
            })
            .collect())
    }

    /// Waits for the merged candidate list of `request_id`.
    pub async fn get_candidates(&self, request_id: &str) -> Result<Vec<HeuristicResult>> {
        let record = self.wait_for(&candidate_topic(request_id)).await?;
        let entries: Vec<CandidateEntry> = record.decode_value()?;
        Ok(entries
            .into_iter()
            .map(|entry| HeuristicResult {
                ts: entry.timestamp,
                value: HeuristicValue::Interval {
                    best: entry.best_value,
                    worst: entry.worst_value,
                },
            })
            .collect())
    }

    async fn wait_for(&self, topic: &str) -> Result<BrokerRecord> {
        tracing::debug!("Subscribed to topic {}. Waiting...", topic);
        let record = self
            .broker
            .consume_one(topic, self.timeout)
            .await?
            .ok_or_else(|| anyhow!("No message on topic {} after {:?}", topic, self.timeout))?;
        tracing::debug!("Received a message from topic {}", topic);
        Ok(record)
    }
}
