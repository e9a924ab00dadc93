//! # gossip-types
//!
//! Wire format types for the epidemic gossip engine.
//!
//! This crate provides the foundational types used across all gossip crates:
//! - [`NodeAddr`] - `(host, port)` peer identity
//! - [`Value`], [`Payload`] - Opaque application data
//! - [`Infection`] - Envelope carrying a payload and its spread bookkeeping
//! - [`GossipError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod addr;
mod error;
mod infection;
mod value;

pub use addr::NodeAddr;
pub use error::GossipError;
pub use infection::Infection;
pub use value::{Payload, Value, DATA_KEY, TAG_KEY};
