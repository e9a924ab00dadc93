//! Configuration loading for gossip-node.
//!
//! Configuration is loaded from a TOML file (default: `gossip.toml`).

use gossip_core::GossipConfig;
use gossip_types::NodeAddr;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for a gossip node.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Identity and seed peers.
    pub node: NodeConfig,
    /// Retry and eviction policy.
    #[serde(default)]
    pub gossip: GossipConfig,
    /// Intervals and timeouts.
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Node identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Host to bind and advertise (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind and advertise (default: 7400).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Initial peers as `host:port` strings.
    #[serde(default, deserialize_with = "deserialize_peers")]
    pub peers: Vec<NodeAddr>,
}

/// Timing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Interval between heartbeat infections (default: 5000 ms).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Interval between retry-queue drains (default: 30000 ms).
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Outbound connect timeout (default: 3000 ms).
    /// A peer that does not accept within this time counts as unreachable.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Largest accepted frame in bytes (default: 1MB).
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7400
}

fn default_heartbeat_interval_ms() -> u64 {
    5_000
}

fn default_retry_interval_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_max_message_size() -> usize {
    1024 * 1024 // 1MB
}

fn deserialize_peers<'de, D>(deserializer: D) -> Result<Vec<NodeAddr>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|peer| {
            peer.parse::<NodeAddr>()
                .map_err(<D::Error as serde::de::Error>::custom)
        })
        .collect()
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl TimingConfig {
    /// Heartbeat interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Retry interval as a `Duration`.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(default_host(), default_port(), Vec::new())
    }
}

impl Config {
    /// Configuration for a node at `host:port` seeded with `peers`.
    pub fn new(host: impl Into<String>, port: u16, peers: Vec<NodeAddr>) -> Self {
        Self {
            node: NodeConfig {
                host: host.into(),
                port,
                peers,
            },
            gossip: GossipConfig::default(),
            timing: TimingConfig::default(),
        }
    }

    /// The node's own address.
    pub fn address(&self) -> NodeAddr {
        NodeAddr::new(self.node.host.clone(), self.node.port)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.address(), NodeAddr::new("127.0.0.1", 7400));
        assert!(config.node.peers.is_empty());
        assert_eq!(config.timing.heartbeat_interval(), Duration::from_secs(5));
        assert_eq!(config.timing.retry_interval(), Duration::from_secs(30));
        assert_eq!(config.timing.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.gossip.retry_capacity, 10);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[node]
host = "10.0.0.1"
port = 9000
peers = ["10.0.0.2:9000", "node-c.local:9001"]

[gossip]
retry_capacity = 3
evict_after_failures = 8

[timing]
heartbeat_interval_ms = 250
connect_timeout_ms = 500
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.address(), NodeAddr::new("10.0.0.1", 9000));
        assert_eq!(
            config.node.peers,
            vec![
                NodeAddr::new("10.0.0.2", 9000),
                NodeAddr::new("node-c.local", 9001)
            ]
        );
        assert_eq!(config.gossip.retry_capacity, 3);
        assert_eq!(config.gossip.evict_after_failures, Some(8));
        assert_eq!(config.timing.heartbeat_interval_ms, 250);
        assert_eq!(config.timing.retry_interval_ms, 30_000);
        assert_eq!(config.timing.connect_timeout_ms, 500);
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[node]\n").unwrap();
        assert_eq!(config.node.port, 7400);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.gossip, GossipConfig::default());
    }

    #[test]
    fn invalid_peer_is_rejected() {
        let toml = r#"
[node]
peers = ["no-port-here"]
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[node]\nport = 7411\npeers = [\"127.0.0.1:7412\"]").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.node.port, 7411);
        assert_eq!(config.node.peers, vec![NodeAddr::new("127.0.0.1", 7412)]);
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let err = Config::from_file(std::path::Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
