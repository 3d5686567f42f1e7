//! Broker client used by workers and the aggregator.

use super::broker::MessageBroker;
use super::protocol::*;
use super::types::BrokerRecord;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const ATTEMPTS: usize = 3;

pub struct HttpBroker {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpBroker {
    pub fn new(host: &str, port: u16) -> Arc<Self> {
        Arc::new(Self {
            base_url: format!("http://{}:{}", host, port),
            http_client: reqwest::Client::new(),
        })
    }

    async fn post_with_retry<T: serde::Serialize>(
        &self,
        endpoint: &str,
        payload: &T,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(url.clone())
                .json(payload)
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow!("Retry attempts exhausted"))
    }
}

#[async_trait]
impl MessageBroker for HttpBroker {
    async fn publish(&self, topic: &str, key: serde_json::Value, value: serde_json::Value) -> Result<u64> {
        let payload = PublishRequest {
            topic: topic.to_string(),
            key,
            value,
        };
        let response = self
            .post_with_retry(ENDPOINT_PUBLISH, &payload, REQUEST_TIMEOUT, ATTEMPTS)
            .await?;
        if !response.status().is_success() {
            bail!("Publish on {} failed: {}", topic, response.status());
        }
        let body: PublishResponse = response.json().await?;
        body.offset
            .ok_or_else(|| anyhow!("Broker did not acknowledge the record on {}", topic))
    }

    async fn consume_one(&self, topic: &str, timeout: Duration) -> Result<Option<BrokerRecord>> {
        let payload = ConsumeRequest {
            topic: topic.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        };
        let response = self
            .post_with_retry(ENDPOINT_CONSUME, &payload, timeout + REQUEST_TIMEOUT, ATTEMPTS)
            .await?;
        if !response.status().is_success() {
            bail!("Consume from {} failed: {}", topic, response.status());
        }
        let body: ConsumeResponse = response.json().await?;
        Ok(body.record)
    }

    async fn poll(&self, topics: &[String], group: &str, timeout: Duration) -> Result<Vec<BrokerRecord>> {
        let payload = PollRequest {
            topics: topics.to_vec(),
            group: group.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        };
        let response = self
            .post_with_retry(ENDPOINT_POLL, &payload, timeout + REQUEST_TIMEOUT, ATTEMPTS)
            .await?;
        if !response.status().is_success() {
            bail!("Poll of {:?} failed: {}", topics, response.status());
        }
        let body: PollResponse = response.json().await?;
        Ok(body.records)
    }
}
