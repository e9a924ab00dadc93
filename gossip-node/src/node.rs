//! The gossip node: infect, receive, re-propagate.
//!
//! A [`Node`] is a cheap, cloneable handle. All state lives in one
//! [`GossipState`] behind a mutex that is only ever held for synchronous
//! set and map work, never across a connect, write or read. That keeps
//! merges atomic with respect to each other while hops to different peers
//! proceed concurrently.
//!
//! Every inbound infection is re-propagated from a freshly spawned task, so
//! the length of a gossip chain is not bounded by stack depth.

use crate::config::Config;
use crate::error::{NodeError, Result};
use crate::metrics::NodeMetrics;
use crate::periodic::{PeriodicHandle, PeriodicTask};
use crate::transport::{TcpTransport, Transport};
use crate::wire::read_frame;
use gossip_core::{GossipState, HopScope};
use gossip_types::{Infection, NodeAddr, Payload, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

struct NodeInner {
    address: NodeAddr,
    config: Config,
    state: Mutex<GossipState>,
    transport: Arc<dyn Transport>,
    metrics: NodeMetrics,
}

/// A gossip peer.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("address", &self.inner.address)
            .field("config", &self.inner.config)
            .field("metrics", &self.inner.metrics)
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Create a node that gossips over TCP.
    pub fn new(config: Config) -> Self {
        let transport = Arc::new(TcpTransport::new(
            config.timing.connect_timeout(),
            config.timing.max_message_size,
        ));
        Self::with_transport(config, transport)
    }

    /// Create a node with a custom transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let address = config.address();
        let state = GossipState::new(
            address.clone(),
            config.node.peers.iter().cloned(),
            config.gossip.clone(),
        );
        Self {
            inner: Arc::new(NodeInner {
                address,
                config,
                state: Mutex::new(state),
                transport,
                metrics: NodeMetrics::default(),
            }),
        }
    }

    /// This node's identity.
    pub fn address(&self) -> &NodeAddr {
        &self.inner.address
    }

    /// The configuration the node was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Operational counters.
    pub fn metrics(&self) -> &NodeMetrics {
        &self.inner.metrics
    }

    /// Snapshot of the known peer set.
    pub async fn known_peers(&self) -> BTreeSet<NodeAddr> {
        self.inner.state.lock().await.known_peers().clone()
    }

    /// Read one key from the shared store.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.state.lock().await.get(key).cloned()
    }

    /// Snapshot of the whole shared store.
    pub async fn store(&self) -> Payload {
        self.inner.state.lock().await.store().clone()
    }

    /// Number of infections waiting for retry.
    pub async fn retry_len(&self) -> usize {
        self.inner.state.lock().await.retry_queue().len()
    }

    /// Copies of the queued infections, oldest first.
    pub async fn pending_retries(&self) -> Vec<Infection> {
        self.inner
            .state
            .lock()
            .await
            .retry_queue()
            .iter()
            .cloned()
            .collect()
    }

    /// Disseminate `payload` to the cluster.
    ///
    /// The payload is applied locally, then sent to one random peer. This
    /// never fails: an undeliverable infection is queued for retry, and a
    /// node with no peers simply keeps the write to itself. The call is
    /// bounded by the transport's connect timeout.
    pub async fn infect(&self, payload: Payload) {
        let infection = self.inner.state.lock().await.originate(payload);
        tracing::debug!(
            "{} infecting with {} key(s)",
            self.inner.address,
            infection.payload.len()
        );
        self.propagate(infection, HopScope::Cluster).await;
    }

    /// Send an empty infection to keep membership converging.
    pub async fn heartbeat(&self) {
        let infection = self.inner.state.lock().await.heartbeat();
        self.propagate(infection, HopScope::Cluster).await;
    }

    /// Retry the oldest undeliverable infection, if there is one.
    pub async fn drain_retry(&self) {
        let next = self.inner.state.lock().await.next_retry();
        match next {
            Some(infection) => {
                tracing::debug!(
                    "{} retrying infection from {} (attempt {})",
                    self.inner.address,
                    infection.origin(),
                    infection.attempts()
                );
                self.propagate(infection, HopScope::Narrowed).await;
            }
            None => tracing::trace!("{} retry queue empty", self.inner.address),
        }
    }

    /// One hop: pick a target, deliver, and requeue on failure.
    async fn propagate(&self, mut infection: Infection, scope: HopScope) {
        let target = {
            let state = self.inner.state.lock().await;
            match next_hop(&state, &mut infection, scope) {
                Some(target) => target,
                None => {
                    tracing::debug!(
                        "{} has no candidates for infection from {}; dropping",
                        self.inner.address,
                        infection.origin()
                    );
                    return;
                }
            }
        };

        let bytes = match infection.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("{} failed to encode infection: {}", self.inner.address, e);
                return;
            }
        };

        match self.inner.transport.deliver(&target, &bytes).await {
            Ok(()) => {
                NodeMetrics::incr(&self.inner.metrics.infections_sent);
                self.inner.state.lock().await.record_success(&target);
                tracing::debug!("{} infected {}", self.inner.address, target);
            }
            Err(e) => {
                NodeMetrics::incr(&self.inner.metrics.delivery_failures);
                tracing::warn!(
                    "{} could not reach {}: {}; requeueing",
                    self.inner.address,
                    target,
                    e
                );
                let outcome = self
                    .inner
                    .state
                    .lock()
                    .await
                    .record_failure(infection, target.clone());

                if !outcome.requeued {
                    NodeMetrics::incr(&self.inner.metrics.retries_expired);
                    tracing::info!(
                        "{} gave up on infection for {} after max retries",
                        self.inner.address,
                        target
                    );
                }
                if outcome.dropped_oldest {
                    NodeMetrics::incr(&self.inner.metrics.retries_dropped);
                    tracing::debug!("{} retry queue full; dropped oldest", self.inner.address);
                }
                if outcome.peer_evicted {
                    NodeMetrics::incr(&self.inner.metrics.peers_evicted);
                    tracing::info!("{} evicted unreachable peer {}", self.inner.address, target);
                }
            }
        }
    }

    /// Apply one encoded infection and spawn its next hop.
    ///
    /// Malformed bytes are counted and rejected without touching state.
    pub async fn handle_frame(&self, bytes: &[u8]) -> Result<()> {
        let infection = Infection::from_bytes(bytes).map_err(|e| {
            NodeMetrics::incr(&self.inner.metrics.decode_errors);
            NodeError::from(e)
        })?;
        NodeMetrics::incr(&self.inner.metrics.infections_received);

        let infection = self.inner.state.lock().await.receive(infection);

        let node = self.clone();
        tokio::spawn(async move {
            node.propagate(infection, HopScope::Cluster).await;
        });
        Ok(())
    }

    /// Read one frame from an inbound connection and handle it.
    pub async fn handle_connection<S>(&self, mut stream: S) -> Result<()>
    where
        S: AsyncRead + Unpin,
    {
        let bytes = read_frame(&mut stream, self.inner.config.timing.max_message_size)
            .await
            .map_err(|e| {
                NodeMetrics::incr(&self.inner.metrics.decode_errors);
                NodeError::from(e)
            })?;
        self.handle_frame(&bytes).await
    }

    /// Start the heartbeat and retry-drain tasks.
    ///
    /// The tasks stop when the returned handles are dropped.
    pub fn start_periodic_tasks(&self) -> Vec<PeriodicHandle> {
        let timing = &self.inner.config.timing;

        let node = self.clone();
        let heartbeat = PeriodicTask::new("heartbeat", timing.heartbeat_interval(), move || {
            let node = node.clone();
            async move { node.heartbeat().await }
        });

        let node = self.clone();
        let retry = PeriodicTask::new("retry", timing.retry_interval(), move || {
            let node = node.clone();
            async move { node.drain_retry().await }
        });

        vec![heartbeat.start(), retry.start()]
    }

    /// Bind the listening socket at this node's address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let listener =
            TcpListener::bind((self.inner.address.host(), self.inner.address.port())).await?;
        tracing::info!("Gossip node listening on {}", self.inner.address);
        Ok(listener)
    }

    /// Bind, start periodic tasks and accept connections until the process
    /// exits.
    pub async fn serve_forever(self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Start periodic tasks and accept connections on `listener`.
    ///
    /// Each connection is handled in its own task. Accept errors are logged
    /// and the loop carries on. Dropping the returned future stops the
    /// periodic tasks.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let _tasks = self.start_periodic_tasks();

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!("Accept failed on {}: {}", self.inner.address, e);
                    continue;
                }
            };

            let node = self.clone();
            tokio::spawn(async move {
                if let Err(e) = node.handle_connection(stream).await {
                    tracing::warn!("Dropped connection from {}: {}", peer, e);
                }
            });
        }
    }
}

/// Choose a target and inject membership. The RNG never lives across an
/// await.
fn next_hop(state: &GossipState, infection: &mut Infection, scope: HopScope) -> Option<NodeAddr> {
    let target = state.select_target(infection, scope, &mut rand::thread_rng())?;
    state.prepare_outbound(infection, scope);
    Some(target)
}
