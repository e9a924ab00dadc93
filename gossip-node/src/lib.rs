//! # gossip-node
//!
//! Async epidemic gossip node.
//!
//! This crate runs a [`GossipState`](gossip_core::GossipState) on the network:
//! - Accepts one length-prefixed infection per inbound TCP connection
//! - Merges membership and payload, then forwards to one random peer
//! - Queues undeliverable infections and retries them on a timer
//! - Sends periodic heartbeats so membership converges without writes
//!
//! ## Architecture
//!
//! ```text
//!   infect(payload)            inbound frame
//!         │                          │
//!         ▼                          ▼
//!   ┌──────────────────────────────────────┐
//!   │  Node                                │
//!   │  ┌────────────────────────────────┐  │
//!   │  │ GossipState (one mutex)        │  │
//!   │  │  known peers · store · retries │  │
//!   │  └────────────────────────────────┘  │
//!   │  heartbeat task · retry task         │
//!   └──────────────┬───────────────────────┘
//!                  │ Transport (TCP or in-memory)
//!                  ▼
//!            one random peer
//! ```
//!
//! ## Wire format
//!
//! A connection carries exactly one frame: a 4-byte big-endian length and
//! the MessagePack-encoded [`Infection`](gossip_types::Infection).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod node;
pub mod periodic;
pub mod transport;
pub mod wire;

pub use config::{Config, ConfigError};
pub use error::{FrameError, NodeError, Result};
pub use metrics::{MetricsSnapshot, NodeMetrics};
pub use node::Node;
pub use periodic::{PeriodicHandle, PeriodicTask};
pub use transport::{MemoryNetwork, MemoryTransport, TcpTransport, Transport, TransportError};
