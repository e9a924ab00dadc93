//! Error types for gossip-node.

use crate::transport::TransportError;

/// Main error type for node operations.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Frame could not be read or was malformed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Infection could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] gossip_types::GossipError),

    /// Delivery to a peer failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Framing errors on a gossip connection.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Declared frame length exceeds the configured limit.
    #[error("frame too large: {size} bytes (limit: {limit} bytes)")]
    TooLarge {
        /// Declared length.
        size: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Stream ended before a full frame arrived.
    #[error("connection closed mid-frame")]
    Truncated,

    /// Underlying stream error.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Result type alias for framing operations.
pub type FrameResult<T> = std::result::Result<T, FrameError>;
