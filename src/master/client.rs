//! Fan-out of one request to every worker.

use super::types::NodeOutcome;
use crate::config::NodeAddress;
use crate::rpc::{SearchCall, SearchRequest};
use crate::transfer::upload_file;

use anyhow::{Result, anyhow, bail};
use std::path::PathBuf;
use std::sync::Arc;

pub struct NodeClient {
    nodes: Vec<NodeAddress>,
}

impl NodeClient {
    pub fn new(nodes: Vec<NodeAddress>) -> Arc<Self> {
        Arc::new(Self { nodes })
    }

    pub fn nodes(&self) -> &[NodeAddress] {
        &self.nodes
    }

    /// Runs the request on every worker concurrently.
    ///
    /// Fails when any worker failed, carrying every worker error.
    pub async fn search_request(&self, request: &SearchRequest) -> Result<Vec<NodeOutcome>> {
        tracing::info!("Executing search request {} on all nodes", request.request_id);
        let calls = self
            .nodes
            .iter()
            .map(|node| Self::search_single_node(node.clone(), request.clone()));
        let answers = futures::future::join_all(calls).await;

        let mut outcomes = Vec::with_capacity(answers.len());
        let mut errors = Vec::new();
        for (node, answer) in self.nodes.iter().zip(answers) {
            match answer {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => errors.push(format!("{}: {:#}", node.address(), e)),
            }
        }

        if !errors.is_empty() {
            bail!(
                "Exceptions thrown by {} worker nodes: {}",
                errors.len(),
                errors.join("; ")
            );
        }
        Ok(outcomes)
    }

    async fn search_single_node(node: NodeAddress, request: SearchRequest) -> Result<NodeOutcome> {
        let mut call = SearchCall::start(&node.address(), &request).await?;

        tracing::info!("Mapping ports for node {}", node.ip);
        let mappings = call.mappings().await?;
        tracing::debug!("{:?}", mappings);

        tracing::info!("Transferring files for node {}", node.ip);
        let uploads: Vec<_> = mappings
            .into_iter()
            .map(|mapping| {
                let host = node.ip.clone();
                tokio::spawn(async move {
                    upload_file(&host, mapping.port, &PathBuf::from(&mapping.file)).await
                })
            })
            .collect();

        let mut failures = Vec::new();
        for outcome in futures::future::join_all(uploads).await {
            match outcome {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => failures.push(format!("{:#}", e)),
                Err(e) => failures.push(e.to_string()),
            }
        }
        if !failures.is_empty() {
            return Err(anyhow!("File transfer failed: {}", failures.join("; ")));
        }
        tracing::info!("Transfer finished for node {}", node.ip);

        tracing::info!("Waiting for returned results from {}", node.ip);
        let (analogues, is_reverse_order) = call.analogues().await?;
        tracing::info!("Results received from {}", node.ip);

        Ok(NodeOutcome {
            analogues,
            is_reverse_order,
        })
    }
}
