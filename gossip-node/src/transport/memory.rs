//! In-process transport for tests and simulations.
//!
//! A [`MemoryNetwork`] routes encoded infections to registered nodes through
//! unbounded channels. Delivering to an address that is not registered fails
//! like a refused TCP connection, which makes partitions and dead peers easy
//! to simulate.

use super::{Transport, TransportError};
use crate::node::Node;
use async_trait::async_trait;
use gossip_types::NodeAddr;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shared routing table for in-memory nodes.
#[derive(Debug, Default)]
pub struct MemoryNetwork {
    inboxes: Mutex<HashMap<NodeAddr, mpsc::UnboundedSender<Vec<u8>>>>,
    delivered: AtomicU64,
}

impl MemoryNetwork {
    /// Create an empty network.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A transport that delivers through this network.
    pub fn transport(self: &Arc<Self>) -> Arc<MemoryTransport> {
        Arc::new(MemoryTransport {
            network: Arc::clone(self),
        })
    }

    /// Route frames for `node`'s address to it.
    ///
    /// Returns the task feeding the node; it ends when the node is
    /// unregistered.
    pub fn register(&self, node: &Node) -> JoinHandle<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        self.lock().insert(node.address().clone(), tx);

        let node = node.clone();
        tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                if let Err(e) = node.handle_frame(&bytes).await {
                    tracing::warn!("{} dropped inbound infection: {}", node.address(), e);
                }
            }
        })
    }

    /// Take `addr` off the network; later deliveries to it are refused.
    pub fn unregister(&self, addr: &NodeAddr) -> bool {
        self.lock().remove(addr).is_some()
    }

    /// Whether `addr` currently accepts deliveries.
    pub fn is_registered(&self, addr: &NodeAddr) -> bool {
        self.lock().contains_key(addr)
    }

    /// Frames successfully handed to a registered node.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<NodeAddr, mpsc::UnboundedSender<Vec<u8>>>> {
        self.inboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`Transport`] backed by a [`MemoryNetwork`].
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    network: Arc<MemoryNetwork>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn deliver(&self, target: &NodeAddr, bytes: &[u8]) -> Result<(), TransportError> {
        let inbox = self
            .network
            .lock()
            .get(target)
            .cloned()
            .ok_or_else(|| TransportError::ConnectionFailed(format!("{target}: connection refused")))?;

        inbox
            .send(bytes.to_vec())
            .map_err(|_| TransportError::ConnectionFailed(format!("{target}: connection reset")))?;
        self.network.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use gossip_types::{Infection, Payload, Value};
    use std::time::Duration;

    #[tokio::test]
    async fn unregistered_target_is_refused() {
        let network = MemoryNetwork::new();
        let transport = network.transport();

        let err = transport
            .deliver(&NodeAddr::new("10.0.0.9", 9999), b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed(_)));
        assert_eq!(network.delivered(), 0);
    }

    #[tokio::test]
    async fn registered_node_receives_frames() {
        let network = MemoryNetwork::new();
        let node = Node::with_transport(Config::new("mem", 1, vec![]), network.transport());
        network.register(&node);

        let mut payload = Payload::new();
        payload.insert("k".into(), Value::from("v"));
        let bytes = Infection::new(NodeAddr::new("mem", 2), payload)
            .to_bytes()
            .unwrap();
        network
            .transport()
            .deliver(node.address(), &bytes)
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while node.get("k").await.is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(network.delivered(), 1);
    }

    #[tokio::test]
    async fn unregister_refuses_later_deliveries() {
        let network = MemoryNetwork::new();
        let node = Node::with_transport(Config::new("mem", 1, vec![]), network.transport());
        network.register(&node);

        assert!(network.unregister(node.address()));
        assert!(!network.is_registered(node.address()));
        assert!(network
            .transport()
            .deliver(node.address(), b"x")
            .await
            .is_err());
    }
}
