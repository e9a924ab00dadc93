//! Transport abstraction for gossip hops.
//!
//! This module provides a pluggable delivery layer that abstracts the
//! underlying connection mechanism (raw TCP, in-memory for tests).
//!
//! # Design
//!
//! The transport is one-shot per hop: `deliver()` connects to the target,
//! writes one encoded infection and closes. There is no session and no
//! reply; acknowledgement travels inside the infection itself.
//!
//! # Example
//!
//! ```ignore
//! let transport = TcpTransport::new(Duration::from_secs(3), MAX_MESSAGE_SIZE);
//! transport.deliver(&target, &infection.to_bytes()?).await?;
//! ```

mod memory;
mod tcp;

pub use memory::{MemoryNetwork, MemoryTransport};
pub use tcp::TcpTransport;

use async_trait::async_trait;
use gossip_types::NodeAddr;
use thiserror::Error;

/// Transport errors.
///
/// Every variant is a transient delivery failure from the node's point of
/// view: the infection is requeued and the node carries on.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, reset or unresolvable.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Send failed after connecting.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Encoded infection exceeds the frame limit.
    #[error("message too large: {size} bytes (limit: {limit} bytes)")]
    MessageTooLarge {
        /// Encoded size.
        size: usize,
        /// Frame limit.
        limit: usize,
    },

    /// Connect or write did not finish in time.
    #[error("connection timeout")]
    Timeout,
}

/// Delivers encoded infections to peers.
///
/// Implementations handle the underlying connection mechanism
/// (TCP, in-memory, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `target`, write `bytes` as one message, close.
    async fn deliver(&self, target: &NodeAddr, bytes: &[u8]) -> Result<(), TransportError>;
}
