//! Infection - the envelope every gossip hop carries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{GossipError, NodeAddr, Payload};

/// A payload plus the bookkeeping needed to spread it.
///
/// The sets are mutated in place as the infection travels: each receiving
/// node acknowledges itself in `infected` and replaces `susceptible` with its
/// own view of the cluster. `origin` always stays in
/// `susceptible ∪ infected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infection {
    origin: NodeAddr,
    /// Application data being disseminated
    pub payload: Payload,
    susceptible: BTreeSet<NodeAddr>,
    infected: BTreeSet<NodeAddr>,
    /// Number of times this infection was requeued after a failed delivery
    #[serde(default)]
    attempts: u32,
}

impl Infection {
    /// Create a fresh infection originating at `origin`.
    pub fn new(origin: NodeAddr, payload: Payload) -> Self {
        Self::with_nodes(origin, payload, BTreeSet::new(), BTreeSet::new())
    }

    /// Create an infection with pre-populated peer sets.
    ///
    /// `origin` is always added to `susceptible`.
    pub fn with_nodes(
        origin: NodeAddr,
        payload: Payload,
        mut susceptible: BTreeSet<NodeAddr>,
        infected: BTreeSet<NodeAddr>,
    ) -> Self {
        susceptible.insert(origin.clone());
        Self {
            origin,
            payload,
            susceptible,
            infected,
            attempts: 0,
        }
    }

    /// An empty-payload infection used to keep membership converging.
    pub fn heartbeat(origin: NodeAddr) -> Self {
        Self::new(origin, Payload::new())
    }

    /// Whether this infection carries no application data.
    pub fn is_heartbeat(&self) -> bool {
        self.payload.is_empty()
    }

    /// Node that created the infection.
    pub fn origin(&self) -> &NodeAddr {
        &self.origin
    }

    /// Peers believed not to have seen this infection yet.
    pub fn susceptible(&self) -> &BTreeSet<NodeAddr> {
        &self.susceptible
    }

    /// Peers known to have seen this infection.
    pub fn infected(&self) -> &BTreeSet<NodeAddr> {
        &self.infected
    }

    /// Requeue count.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a requeue and return the new count.
    pub fn bump_attempts(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// Acknowledge that `addr` has seen this infection.
    pub fn mark_infected(&mut self, addr: NodeAddr) {
        self.infected.insert(addr);
    }

    /// Union `peers` into the susceptible set.
    pub fn broaden<'a>(&mut self, peers: impl IntoIterator<Item = &'a NodeAddr>) {
        self.susceptible.extend(peers.into_iter().cloned());
    }

    /// Replace the susceptible set with a receiver's world view.
    pub fn replace_susceptible(&mut self, peers: BTreeSet<NodeAddr>) {
        self.susceptible = peers;
        if !self.infected.contains(&self.origin) {
            self.susceptible.insert(self.origin.clone());
        }
    }

    /// Restrict the infection to a single target after a failed delivery.
    ///
    /// Afterwards `susceptible` is exactly `{target}`. When the target is
    /// someone else the origin moves to `infected` so the origin invariant
    /// still holds; when the target is the origin it stays uninfected, so a
    /// retry can still reach it.
    pub fn narrow_to(&mut self, target: NodeAddr) {
        if target != self.origin {
            self.infected.insert(self.origin.clone());
        }
        self.susceptible = BTreeSet::from([target]);
    }

    /// Peers this infection could be sent to next from `local`.
    ///
    /// `(extra ∪ susceptible) − infected − {local}`.
    pub fn candidates<'a>(
        &'a self,
        local: &'a NodeAddr,
        extra: impl IntoIterator<Item = &'a NodeAddr> + 'a,
    ) -> impl Iterator<Item = &'a NodeAddr> + 'a {
        let extra: BTreeSet<&NodeAddr> = extra.into_iter().collect();
        let mut all = self.susceptible.iter().collect::<BTreeSet<_>>();
        all.extend(extra);
        all.into_iter()
            .filter(move |addr| *addr != local && !self.infected.contains(*addr))
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, GossipError> {
        rmp_serde::to_vec(self).map_err(GossipError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GossipError> {
        rmp_serde::from_slice(bytes).map_err(GossipError::Deserialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn addr(port: u16) -> NodeAddr {
        NodeAddr::new("127.0.0.1", port)
    }

    fn origin_held(infection: &Infection) -> bool {
        infection.susceptible().contains(infection.origin())
            || infection.infected().contains(infection.origin())
    }

    #[test]
    fn new_inserts_origin_into_susceptible() {
        let infection = Infection::new(addr(1), Payload::new());
        assert!(infection.susceptible().contains(&addr(1)));
        assert!(infection.infected().is_empty());
        assert!(infection.is_heartbeat());
    }

    #[test]
    fn with_nodes_keeps_given_sets() {
        let infection = Infection::with_nodes(
            addr(1),
            Payload::new(),
            BTreeSet::from([addr(2)]),
            BTreeSet::from([addr(3)]),
        );
        assert_eq!(infection.susceptible(), &BTreeSet::from([addr(1), addr(2)]));
        assert_eq!(infection.infected(), &BTreeSet::from([addr(3)]));
    }

    #[test]
    fn candidates_exclude_local_and_infected() {
        let mut infection = Infection::new(addr(1), Payload::new());
        infection.mark_infected(addr(2));
        let known = [addr(2), addr(3), addr(4)];

        let candidates: Vec<_> = infection.candidates(&addr(4), known.iter()).cloned().collect();
        assert_eq!(candidates, vec![addr(1), addr(3)]);
    }

    #[test]
    fn narrow_to_keeps_origin_invariant() {
        let mut infection = Infection::new(addr(1), Payload::new());
        infection.broaden([addr(2), addr(3)].iter());

        infection.narrow_to(addr(3));

        assert_eq!(infection.susceptible(), &BTreeSet::from([addr(3)]));
        assert!(origin_held(&infection));
    }

    #[test]
    fn narrow_to_origin_leaves_origin_reachable() {
        let mut infection = Infection::new(addr(1), Payload::new());
        infection.mark_infected(addr(2));

        infection.narrow_to(addr(1));

        assert_eq!(infection.susceptible(), &BTreeSet::from([addr(1)]));
        assert!(!infection.infected().contains(&addr(1)));
        let candidates: Vec<_> = infection
            .candidates(&addr(2), std::iter::empty())
            .cloned()
            .collect();
        assert_eq!(candidates, vec![addr(1)]);
    }

    #[test]
    fn replace_susceptible_keeps_origin_invariant() {
        let mut infection = Infection::new(addr(1), Payload::new());
        infection.replace_susceptible(BTreeSet::from([addr(5)]));
        assert!(origin_held(&infection));
    }

    #[test]
    fn bump_attempts_counts() {
        let mut infection = Infection::new(addr(1), Payload::new());
        assert_eq!(infection.bump_attempts(), 1);
        assert_eq!(infection.bump_attempts(), 2);
        assert_eq!(infection.attempts(), 2);
    }

    #[test]
    fn msgpack_carries_sets_and_payload() {
        let mut payload = Payload::new();
        payload.insert("k".into(), Value::from("v"));
        let mut infection = Infection::with_nodes(
            addr(1),
            payload,
            BTreeSet::from([addr(2)]),
            BTreeSet::from([addr(3)]),
        );
        infection.bump_attempts();

        let restored = Infection::from_bytes(&infection.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, infection);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = Infection::from_bytes(b"\xc1not msgpack").unwrap_err();
        assert!(matches!(err, GossipError::Deserialization(_)));
    }
}
