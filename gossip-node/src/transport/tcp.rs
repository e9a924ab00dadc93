//! Raw TCP transport: one connection per hop.

use super::{Transport, TransportError};
use crate::error::FrameError;
use crate::wire::write_frame;
use async_trait::async_trait;
use gossip_types::NodeAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// TCP delivery with a bounded connect and write time.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
    max_message_size: usize,
}

impl TcpTransport {
    /// Create a transport; `connect_timeout` bounds both connect and write.
    pub fn new(connect_timeout: Duration, max_message_size: usize) -> Self {
        Self {
            connect_timeout,
            max_message_size,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn deliver(&self, target: &NodeAddr, bytes: &[u8]) -> Result<(), TransportError> {
        let mut stream = match timeout(
            self.connect_timeout,
            TcpStream::connect((target.host(), target.port())),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(TransportError::ConnectionFailed(e.to_string())),
            Err(_) => return Err(TransportError::Timeout),
        };

        match timeout(
            self.connect_timeout,
            write_frame(&mut stream, bytes, self.max_message_size),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(FrameError::TooLarge { size, limit })) => {
                return Err(TransportError::MessageTooLarge { size, limit })
            }
            Ok(Err(e)) => return Err(TransportError::SendFailed(e.to_string())),
            Err(_) => return Err(TransportError::Timeout),
        }

        // Best effort: the frame is already written.
        if let Err(e) = stream.shutdown().await {
            tracing::debug!("Shutdown after delivery to {} failed: {}", target, e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{read_frame, MAX_MESSAGE_SIZE};
    use tokio::net::TcpListener;

    fn transport() -> TcpTransport {
        TcpTransport::new(Duration::from_secs(2), MAX_MESSAGE_SIZE)
    }

    #[tokio::test]
    async fn delivers_one_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = NodeAddr::from(listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_frame(&mut stream, MAX_MESSAGE_SIZE).await.unwrap()
        });

        transport().deliver(&target, b"infection").await.unwrap();
        assert_eq!(server.await.unwrap(), b"infection");
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = NodeAddr::from(listener.local_addr().unwrap());
        drop(listener);

        let err = transport().deliver(&target, b"x").await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::ConnectionFailed(_) | TransportError::Timeout
        ));
    }

    #[tokio::test]
    async fn stalled_peer_times_out() {
        // Never accepted, never read: the frame cannot fit in socket buffers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = NodeAddr::from(listener.local_addr().unwrap());
        let frame = vec![0u8; 32 * 1024 * 1024];
        let transport = TcpTransport::new(Duration::from_millis(200), 64 * 1024 * 1024);

        let err = transport.deliver(&target, &frame).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
        drop(listener);
    }

    #[tokio::test]
    async fn oversized_message_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = NodeAddr::from(listener.local_addr().unwrap());
        let transport = TcpTransport::new(Duration::from_secs(2), 4);

        let err = transport.deliver(&target, b"too long").await.unwrap_err();
        assert!(matches!(err, TransportError::MessageTooLarge { size: 8, limit: 4 }));
    }
}
