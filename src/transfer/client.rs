//! Sending side of the file transfer, used by the master.

use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

const CONNECT_ATTEMPTS: usize = 6;

/// Connects to a worker's transfer port and streams the whole file, unframed.
pub async fn upload_file(host: &str, port: u16, path: &Path) -> Result<u64> {
    let mut stream = connect_with_retry(host, port, CONNECT_ATTEMPTS).await?;
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let sent = tokio::io::copy(&mut file, &mut stream).await?;
    stream.shutdown().await?;
    tracing::debug!("Sent {} ({} bytes) to {}:{}", path.display(), sent, host, port);
    Ok(sent)
}

async fn connect_with_retry(host: &str, port: u16, attempts: usize) -> Result<TcpStream> {
    let mut delay_ms = 150u64;

    for attempt in 0..attempts {
        match TcpStream::connect((host, port)).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                if attempt + 1 == attempts {
                    return Err(anyhow!(e).context(format!("Failed to connect to {}:{}", host, port)));
                }
                let jitter = rand::random::<u64>() % 50;
                tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                delay_ms = (delay_ms * 2).min(1200);
            }
        }
    }

    Err(anyhow!("Retry attempts exhausted"))
}
