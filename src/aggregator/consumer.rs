//! Consumer loop of the aggregator process.

use super::service::AggregationService;
use crate::queue::{
    BrokerRecord, CandidatesMessage, MessageBroker, NEW_CANDIDATES_TOPIC, NEW_REQUESTS_TOPIC,
    ResultsMessage, candidate_topic,
};

use anyhow::{Result, bail};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const POLL_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct AggregatorConsumer {
    service: Arc<AggregationService>,
    broker: Arc<dyn MessageBroker>,
    group_id: String,
    stopped: AtomicBool,
}

impl AggregatorConsumer {
    pub fn new(service: Arc<AggregationService>, broker: Arc<dyn MessageBroker>, group_id: &str) -> Arc<Self> {
        Arc::new(Self {
            service,
            broker,
            group_id: group_id.to_string(),
            stopped: AtomicBool::new(false),
        })
    }

    /// Polls both input topics until `stop` is called.
    pub async fn start(self: Arc<Self>) {
        let topics = vec![NEW_REQUESTS_TOPIC.to_string(), NEW_CANDIDATES_TOPIC.to_string()];
        tracing::info!("Aggregator listening on {:?} as group {}", topics, self.group_id);

        while !self.stopped.load(Ordering::SeqCst) {
            let records = match self.broker.poll(&topics, &self.group_id, POLL_TIMEOUT).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!("Poll failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    continue;
                }
            };
            for record in &records {
                if let Err(e) = self.handle_record(record).await {
                    tracing::error!(
                        "Dropping record {} of topic {}: {:#}",
                        record.offset,
                        record.topic,
                        e
                    );
                }
            }
        }
        tracing::info!("Aggregator stopped");
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Merges one record and publishes the reply when its request is complete.
    pub async fn handle_record(&self, record: &BrokerRecord) -> Result<()> {
        let key = record.decode_key()?;

        match record.topic.as_str() {
            NEW_REQUESTS_TOPIC => {
                let message: ResultsMessage = record.decode_value()?;
                if let Some(merged) = self.service.process_results_message(&key, message)? {
                    self.produce(&key.request_id, serde_json::to_value(merged)?).await?;
                }
            }
            NEW_CANDIDATES_TOPIC => {
                let message: CandidatesMessage = record.decode_value()?;
                if let Some(merged) = self.service.process_candidates_message(&key, message)? {
                    self.produce(&candidate_topic(&key.request_id), serde_json::to_value(merged)?)
                        .await?;
                }
            }
            other => bail!("Unexpected topic {}", other),
        }
        Ok(())
    }

    async fn produce(&self, topic: &str, value: serde_json::Value) -> Result<()> {
        tracing::info!("Going to produce a topic: {}", topic);
        self.broker
            .publish(topic, serde_json::json!({ "topic": topic }), value)
            .await?;
        tracing::info!("Topic {} produced", topic);
        Ok(())
    }
}
