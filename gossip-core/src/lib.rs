//! # gossip-core
//!
//! Pure logic for the epidemic gossip engine (no I/O, instant tests).
//!
//! This crate implements the per-node state machine for gossip hops
//! without any network I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! Everything here is synchronous. A node's membership view, shared store
//! and retry queue are mutated only through [`GossipState`], and callers
//! never hold that state across a suspension point.
//!
//! The actual I/O (connections, timers) is performed by `gossip-node`,
//! which interprets the decisions made here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod retry;
pub mod state;

pub use config::GossipConfig;
pub use retry::RetryQueue;
pub use state::{FailureOutcome, GossipState, HopScope};
