//! `u32` big-endian length prefix followed by a bincode body.

use anyhow::{Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = bincode::serialize(message)?;
    if body.len() > MAX_FRAME_SIZE {
        bail!("Frame of {} bytes exceeds the limit of {}", body.len(), MAX_FRAME_SIZE);
    }
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the next frame. `None` when the peer closed the stream between frames.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_SIZE {
        bail!("Frame of {} bytes exceeds the limit of {}", len, MAX_FRAME_SIZE);
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(bincode::deserialize(&body)?))
}
