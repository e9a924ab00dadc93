//! Length-prefixed framing for gossip connections.
//!
//! Each hop opens a connection, writes exactly one frame and closes. A frame
//! is a 4-byte big-endian length followed by the MessagePack-encoded
//! [`Infection`](gossip_types::Infection). The length is checked against the
//! configured limit before anything is allocated.

use crate::error::{FrameError, FrameResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default maximum frame size (1MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Write one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, bytes: &[u8], max_size: usize) -> FrameResult<()>
where
    W: AsyncWrite + Unpin,
{
    if bytes.len() > max_size || bytes.len() > u32::MAX as usize {
        return Err(FrameError::TooLarge {
            size: bytes.len(),
            limit: max_size,
        });
    }

    // Write 4-byte length prefix
    let len = bytes.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;

    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> FrameResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    read_exact(reader, &mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > max_size {
        return Err(FrameError::TooLarge {
            size: len,
            limit: max_size,
        });
    }

    let mut buf = vec![0u8; len];
    read_exact(reader, &mut buf).await?;
    Ok(buf)
}

async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> FrameResult<()>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(FrameError::Truncated),
        Err(e) => Err(e.into()),
    }
}
