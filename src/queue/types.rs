//! Queue payloads exchanged between workers and the aggregator.
//!
//! Field names follow the wire schema (`final-results`, `sum-counter`, ...). Unknown
//! fields are rejected when a payload is decoded.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NEW_REQUESTS_TOPIC: &str = "raw-requests";
pub const NEW_CANDIDATES_TOPIC: &str = "raw-candidates";
pub const CANDIDATE_TOPIC_PREFIX: &str = "candidate-";

/// Topic the merged candidate list of a request is published to.
pub fn candidate_topic(request_id: &str) -> String {
    format!("{}{}", CANDIDATE_TOPIC_PREFIX, request_id)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageKey {
    pub request_id: String,
    pub node_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultEntry {
    pub timestamp: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialResultEntry {
    pub timestamp: String,
    pub value: f64,
    pub sum_counter: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CandidateEntry {
    pub timestamp: String,
    pub best_value: f64,
    pub worst_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialCandidateEntry {
    pub timestamp: String,
    pub best_value: f64,
    pub worst_value: f64,
    pub sum_counter: usize,
}

/// What one worker publishes for one request and phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct QueueMessage<F, P> {
    pub final_results: Vec<F>,
    pub partial_results: Vec<P>,
    pub size_input: usize,
    pub num_results: usize,
    #[serde(rename = "is-reserve-order")]
    pub is_reverse_order: bool,
}

pub type ResultsMessage = QueueMessage<ResultEntry, PartialResultEntry>;
pub type CandidatesMessage = QueueMessage<CandidateEntry, PartialCandidateEntry>;

/// One stored record of a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerRecord {
    pub topic: String,
    pub offset: u64,
    pub key: serde_json::Value,
    pub value: serde_json::Value,
}

impl BrokerRecord {
    pub fn decode_key(&self) -> Result<MessageKey, SchemaError> {
        decode(&self.topic, &self.key)
    }

    pub fn decode_value<T: DeserializeOwned>(&self) -> Result<T, SchemaError> {
        decode(&self.topic, &self.value)
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Value received when subscribing to topic {topic} came null")]
    NullValue { topic: String },

    #[error("Message on topic {topic} does not match the schema: {reason}")]
    Invalid { topic: String, reason: String },
}

/// Validates `value` against the schema of `T`.
pub fn decode<T: DeserializeOwned>(topic: &str, value: &serde_json::Value) -> Result<T, SchemaError> {
    if value.is_null() {
        return Err(SchemaError::NullValue {
            topic: topic.to_string(),
        });
    }
    serde_json::from_value(value.clone()).map_err(|e| SchemaError::Invalid {
        topic: topic.to_string(),
        reason: e.to_string(),
    })
}
