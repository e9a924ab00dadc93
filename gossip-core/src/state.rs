//! Per-node gossip state machine.
//!
//! This module owns everything a node knows: its membership view, its shared
//! key/value store, its retry queue and per-peer failure counts. Every
//! method is synchronous, so a caller that serializes access (one lock, one
//! task) gets atomic merges for free.
//!
//! The actual I/O (connecting, writing frames) is performed by gossip-node,
//! not by this module. This enables instant unit testing without network
//! mocks.

use std::collections::{BTreeSet, HashMap};

use gossip_types::{Infection, NodeAddr, Payload, Value};
use rand::seq::IteratorRandom;
use rand::Rng;

use crate::{GossipConfig, RetryQueue};

/// Which peers a hop may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopScope {
    /// Fresh or relayed infections: the node's known peers plus the
    /// infection's susceptible set.
    Cluster,
    /// Retried infections: only the infection's own susceptible set, which
    /// after a failure is just the peer that failed.
    Narrowed,
}

/// What [`GossipState::record_failure`] did with an undeliverable infection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureOutcome {
    /// The infection was placed on the retry queue.
    pub requeued: bool,
    /// Requeueing pushed the oldest queued infection out.
    pub dropped_oldest: bool,
    /// The target was forgotten under the eviction policy.
    pub peer_evicted: bool,
}

/// Membership view, shared store and retry queue of a single node.
#[derive(Debug)]
pub struct GossipState {
    address: NodeAddr,
    known_peers: BTreeSet<NodeAddr>,
    store: Payload,
    retry_queue: RetryQueue,
    /// Consecutive delivery failures per peer.
    failures: HashMap<NodeAddr, u32>,
    config: GossipConfig,
}

impl GossipState {
    /// Create the state for the node at `address`.
    ///
    /// The node's own address is never added to its known peers here.
    pub fn new(
        address: NodeAddr,
        initial_peers: impl IntoIterator<Item = NodeAddr>,
        config: GossipConfig,
    ) -> Self {
        let known_peers = initial_peers
            .into_iter()
            .filter(|peer| *peer != address)
            .collect();
        Self {
            address,
            known_peers,
            store: Payload::new(),
            retry_queue: RetryQueue::new(config.retry_capacity),
            failures: HashMap::new(),
            config,
        }
    }

    /// This node's identity.
    pub fn address(&self) -> &NodeAddr {
        &self.address
    }

    /// Locally cached view of the cluster.
    pub fn known_peers(&self) -> &BTreeSet<NodeAddr> {
        &self.known_peers
    }

    /// The shared key/value store.
    pub fn store(&self) -> &Payload {
        &self.store
    }

    /// Read one key from the shared store.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    /// The retry queue.
    pub fn retry_queue(&self) -> &RetryQueue {
        &self.retry_queue
    }

    /// Policy in effect.
    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    /// Consecutive failed deliveries to `peer`.
    pub fn failure_count(&self, peer: &NodeAddr) -> u32 {
        self.failures.get(peer).copied().unwrap_or(0)
    }

    /// Start a new infection carrying `payload` from this node.
    ///
    /// The payload is applied to the local store first so the originating
    /// node sees its own write even if nothing can be delivered.
    pub fn originate(&mut self, payload: Payload) -> Infection {
        self.merge_payload(&payload);
        Infection::new(self.address.clone(), payload)
    }

    /// A zero-payload infection from this node.
    pub fn heartbeat(&self) -> Infection {
        Infection::heartbeat(self.address.clone())
    }

    /// Pick the next hop for `infection`, uniformly at random.
    ///
    /// Returns `None` when no candidate remains; for a relayed infection
    /// that is normal termination. Never returns this node's own address.
    pub fn select_target<R: Rng + ?Sized>(
        &self,
        infection: &Infection,
        scope: HopScope,
        rng: &mut R,
    ) -> Option<NodeAddr> {
        let candidates = match scope {
            HopScope::Cluster => infection
                .candidates(&self.address, self.known_peers.iter())
                .choose(rng),
            HopScope::Narrowed => infection
                .candidates(&self.address, std::iter::empty())
                .choose(rng),
        };
        candidates.cloned()
    }

    /// Anti-entropy injection before an outbound write.
    ///
    /// Cluster-scope hops carry this node's known peers so the receiver
    /// learns about them. Narrowed retries are left untouched.
    pub fn prepare_outbound(&self, infection: &mut Infection, scope: HopScope) {
        if scope == HopScope::Cluster {
            infection.broaden(self.known_peers.iter());
        }
    }

    /// Apply an inbound infection and return it ready for re-propagation.
    ///
    /// 1. Acknowledge this node in `infected`.
    /// 2. Merge membership: `known ∪= susceptible ∪ infected`, then hand the
    ///    merged view on as the new `susceptible`.
    /// 3. Merge payload, last writer wins per key.
    pub fn receive(&mut self, mut infection: Infection) -> Infection {
        infection.mark_infected(self.address.clone());

        self.known_peers.extend(infection.susceptible().iter().cloned());
        self.known_peers.extend(infection.infected().iter().cloned());
        infection.replace_susceptible(self.known_peers.clone());

        self.merge_payload(&infection.payload);
        infection
    }

    /// Overwrite local keys with `payload`. Idempotent.
    pub fn merge_payload(&mut self, payload: &Payload) {
        for (key, value) in payload {
            self.store.insert(key.clone(), value.clone());
        }
    }

    /// A delivery to `target` succeeded.
    pub fn record_success(&mut self, target: &NodeAddr) {
        self.failures.remove(target);
    }

    /// A delivery to `target` failed.
    ///
    /// The infection is narrowed to `{target}` so its retry cannot fan out
    /// to unrelated peers, then requeued unless it has already been retried
    /// `max_retry_attempts` times.
    pub fn record_failure(&mut self, mut infection: Infection, target: NodeAddr) -> FailureOutcome {
        let mut outcome = FailureOutcome::default();

        let count = self.failures.entry(target.clone()).or_insert(0);
        *count = count.saturating_add(1);
        if let Some(limit) = self.config.evict_after_failures {
            if *count >= limit {
                self.failures.remove(&target);
                outcome.peer_evicted = self.known_peers.remove(&target);
            }
        }

        infection.narrow_to(target);
        if infection.bump_attempts() > self.config.max_retry_attempts {
            return outcome;
        }

        outcome.requeued = true;
        outcome.dropped_oldest = self.retry_queue.push(infection).is_some();
        outcome
    }

    /// Take the oldest infection awaiting retry.
    pub fn next_retry(&mut self) -> Option<Infection> {
        self.retry_queue.pop_oldest()
    }
}
