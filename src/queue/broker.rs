//! Message broker contract and the in-process topic log.
//!
//! Topics are append-only logs. `consume_one` always reads from the start of a topic
//! (one reply per request topic), while `poll` advances a per-group offset.

use super::types::BrokerRecord;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Appends a record and returns its offset once the broker stored it.
    async fn publish(&self, topic: &str, key: serde_json::Value, value: serde_json::Value) -> Result<u64>;

    /// Seeks to the start of `topic` and waits for its first record.
    ///
    /// Returns `None` when nothing arrived within `timeout`.
    async fn consume_one(&self, topic: &str, timeout: Duration) -> Result<Option<BrokerRecord>>;

    /// Returns every record of `topics` past the offsets of `group`, waiting up to
    /// `timeout` for at least one.
    async fn poll(&self, topics: &[String], group: &str, timeout: Duration) -> Result<Vec<BrokerRecord>>;
}

pub struct InMemoryBroker {
    topics: DashMap<String, Vec<BrokerRecord>>,
    offsets: DashMap<(String, String), usize>,
    notify: Notify,
}

impl InMemoryBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            topics: DashMap::new(),
            offsets: DashMap::new(),
            notify: Notify::new(),
        })
    }

    pub fn topic_len(&self, topic: &str) -> usize {
        self.topics.get(topic).map(|records| records.len()).unwrap_or(0)
    }

    pub fn list_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topics.iter().map(|entry| entry.key().clone()).collect();
        topics.sort();
        topics
    }

    fn first_record(&self, topic: &str) -> Option<BrokerRecord> {
        self.topics.get(topic).and_then(|records| records.first().cloned())
    }

    fn take_pending(&self, topics: &[String], group: &str) -> Vec<BrokerRecord> {
        let mut pending = Vec::new();
        for topic in topics {
            let Some(records) = self.topics.get(topic) else {
                continue;
            };
            let mut offset = self
                .offsets
                .entry((group.to_string(), topic.clone()))
                .or_insert(0);
            if *offset < records.len() {
                pending.extend(records[*offset..].iter().cloned());
                *offset = records.len();
            }
        }
        pending
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, topic: &str, key: serde_json::Value, value: serde_json::Value) -> Result<u64> {
        let offset = {
            let mut records = self.topics.entry(topic.to_string()).or_default();
            let offset = records.len() as u64;
            records.push(BrokerRecord {
                topic: topic.to_string(),
                offset,
                key,
                value,
            });
            offset
        };
        tracing::debug!("Stored record {} on topic {}", offset, topic);
        self.notify.notify_waiters();
        Ok(offset)
    }

    async fn consume_one(&self, topic: &str, timeout: Duration) -> Result<Option<BrokerRecord>> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(record) = self.first_record(topic) {
                return Ok(Some(record));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn poll(&self, topics: &[String], group: &str, timeout: Duration) -> Result<Vec<BrokerRecord>> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let pending = self.take_pending(topics, group);
            if !pending.is_empty() {
                return Ok(pending);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }
}
