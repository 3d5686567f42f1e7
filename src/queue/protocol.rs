//! HTTP DTOs of the broker service.

use super::types::BrokerRecord;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_PUBLISH: &str = "/topics/publish";
pub const ENDPOINT_CONSUME: &str = "/topics/consume";
pub const ENDPOINT_POLL: &str = "/topics/poll";

#[derive(Debug, Serialize, Deserialize)]
pub struct PublishRequest {
    pub topic: String,
    pub key: serde_json::Value,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsumeRequest {
    pub topic: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsumeResponse {
    pub record: Option<BrokerRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollRequest {
    pub topics: Vec<String>,
    pub group: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollResponse {
    pub records: Vec<BrokerRecord>,
}
