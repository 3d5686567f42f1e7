//! Caller side of the search call, used by the master.

use super::codec::{read_frame, write_frame};
use super::types::{Analogue, SearchRequest, SearchResponse};
use crate::transfer::FilePortMapping;

use anyhow::{Context, Result, anyhow, bail};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

pub struct SearchCall {
    reader: OwnedReadHalf,
    _writer: OwnedWriteHalf,
}

impl SearchCall {
    /// Connects to a worker and sends the request frame.
    pub async fn start(address: &str, request: &SearchRequest) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .await
            .with_context(|| format!("Failed to connect to worker {}", address))?;
        let (reader, mut writer) = stream.into_split();
        write_frame(&mut writer, request).await?;
        Ok(Self {
            reader,
            _writer: writer,
        })
    }

    /// The next response. A `Status` frame or a closed stream is an error.
    pub async fn next_response(&mut self) -> Result<SearchResponse> {
        match read_frame(&mut self.reader).await? {
            Some(SearchResponse::Status { code, detail }) => {
                bail!("Worker answered with status {:?}: {}", code, detail)
            }
            Some(response) => Ok(response),
            None => Err(anyhow!("Worker closed the stream")),
        }
    }

    pub async fn mappings(&mut self) -> Result<Vec<FilePortMapping>> {
        match self.next_response().await? {
            SearchResponse::Mappings(mappings) => Ok(mappings),
            other => bail!("Expected the port mapping, received {:?}", other),
        }
    }

    /// The analogues and whether larger similarity values are better.
    pub async fn analogues(&mut self) -> Result<(Vec<Analogue>, bool)> {
        match self.next_response().await? {
            SearchResponse::Analogues {
                analogues,
                reverse_sort_order_corr_function,
            } => Ok((analogues, reverse_sort_order_corr_function)),
            other => bail!("Expected the analogues, received {:?}", other),
        }
    }
}
