//! Tunables for the gossip state machine.

use serde::Deserialize;

/// Gossip policy configuration (`[gossip]` section of the node config).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GossipConfig {
    /// Maximum infections held for retry (default: 10).
    #[serde(default = "default_retry_capacity")]
    pub retry_capacity: usize,
    /// Requeues allowed before an infection is discarded (default: 5).
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    /// Forget a peer after this many consecutive failed deliveries.
    ///
    /// Unset by default: peers are never evicted, a failing peer is only
    /// deprioritized by requeueing.
    #[serde(default)]
    pub evict_after_failures: Option<u32>,
}

fn default_retry_capacity() -> usize {
    10
}

fn default_max_retry_attempts() -> u32 {
    5
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            retry_capacity: default_retry_capacity(),
            max_retry_attempts: default_max_retry_attempts(),
            evict_after_failures: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GossipConfig::default();
        assert_eq!(config.retry_capacity, 10);
        assert_eq!(config.max_retry_attempts, 5);
        assert_eq!(config.evict_after_failures, None);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: GossipConfig = toml::from_str("").unwrap();
        assert_eq!(config, GossipConfig::default());
    }

    #[test]
    fn eviction_configurable_from_toml() {
        let config: GossipConfig = toml::from_str(
            r#"
retry_capacity = 3
evict_after_failures = 4
"#,
        )
        .unwrap();
        assert_eq!(config.retry_capacity, 3);
        assert_eq!(config.evict_after_failures, Some(4));
        assert_eq!(config.max_retry_attempts, 5);
    }
}
