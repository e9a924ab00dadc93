//! Error types for the gossip wire format.

use thiserror::Error;

/// Errors that can occur while encoding, decoding or parsing wire types.
#[derive(Debug, Error)]
pub enum GossipError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Address was not of the form `host:port`
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}
