//! Operational counters for a gossip node.

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational metrics for monitoring node activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64`; no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct NodeMetrics {
    /// Infections written to a peer successfully.
    pub infections_sent: AtomicU64,
    /// Infections decoded from inbound connections.
    pub infections_received: AtomicU64,
    /// Outbound deliveries that failed (refused, reset, timeout).
    pub delivery_failures: AtomicU64,
    /// Queued infections dropped because the retry queue was full.
    pub retries_dropped: AtomicU64,
    /// Infections discarded after exhausting their retry attempts.
    pub retries_expired: AtomicU64,
    /// Inbound connections whose frame or payload could not be decoded.
    pub decode_errors: AtomicU64,
    /// Peers forgotten under the eviction policy.
    pub peers_evicted: AtomicU64,
}

/// Point-in-time copy of [`NodeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// See [`NodeMetrics::infections_sent`].
    pub infections_sent: u64,
    /// See [`NodeMetrics::infections_received`].
    pub infections_received: u64,
    /// See [`NodeMetrics::delivery_failures`].
    pub delivery_failures: u64,
    /// See [`NodeMetrics::retries_dropped`].
    pub retries_dropped: u64,
    /// See [`NodeMetrics::retries_expired`].
    pub retries_expired: u64,
    /// See [`NodeMetrics::decode_errors`].
    pub decode_errors: u64,
    /// See [`NodeMetrics::peers_evicted`].
    pub peers_evicted: u64,
}

impl NodeMetrics {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            infections_sent: self.infections_sent.load(Ordering::Relaxed),
            infections_received: self.infections_received.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            retries_dropped: self.retries_dropped.load(Ordering::Relaxed),
            retries_expired: self.retries_expired.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            peers_evicted: self.peers_evicted.load(Ordering::Relaxed),
        }
    }
}
