//! Worker side of the search call.

use super::codec::{read_frame, write_frame};
use super::types::{RpcCode, SearchRequest, SearchResponse};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, mpsc};

pub const DEFAULT_MAX_WORKERS: usize = 10;

pub type ResponseSender = mpsc::Sender<SearchResponse>;

/// Serves one search call, streaming its responses through `responses`.
///
/// An `Err` is reported to the caller as an `Internal` status.
#[async_trait]
pub trait SearchController: Send + Sync {
    async fn search(&self, request: SearchRequest, responses: ResponseSender) -> Result<()>;
}

pub struct RpcServer {
    controller: Arc<dyn SearchController>,
    permits: Arc<Semaphore>,
}

impl RpcServer {
    pub fn new(controller: Arc<dyn SearchController>, max_workers: usize) -> Arc<Self> {
        Arc::new(Self {
            controller,
            permits: Arc::new(Semaphore::new(max_workers)),
        })
    }

    /// Accepts calls until the listener fails. At most `max_workers` calls run at once.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        tracing::info!("Search RPC listening on {}", listener.local_addr()?);

        loop {
            let permit = self.permits.clone().acquire_owned().await?;
            let (stream, peer) = listener.accept().await?;
            tracing::debug!("Accepted search call from {}", peer);

            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream).await {
                    tracing::warn!("Search call from {} ended with an error: {}", peer, e);
                }
                drop(permit);
            });
        }
    }

    async fn handle_connection(&self, stream: TcpStream) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();
        let request: SearchRequest = read_frame(&mut reader)
            .await?
            .ok_or_else(|| anyhow!("Connection closed before the request was sent"))?;
        let request_id = request.request_id.clone();
        tracing::info!("Received search request {}", request_id);

        let (tx, mut rx) = mpsc::channel(4);
        let controller = self.controller.clone();
        let call = tokio::spawn(async move { controller.search(request, tx).await });

        while let Some(response) = rx.recv().await {
            write_frame(&mut writer, &response).await?;
        }

        let status = match call.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                tracing::error!("Request {} failed: {:#}", request_id, e);
                Some(format!("{:?}", e))
            }
            Err(e) => {
                tracing::error!("Request {} panicked: {}", request_id, e);
                Some(e.to_string())
            }
        };
        if let Some(detail) = status {
            let response = SearchResponse::Status {
                code: RpcCode::Internal,
                detail,
            };
            write_frame(&mut writer, &response).await?;
        }
        writer.shutdown().await?;
        Ok(())
    }
}
