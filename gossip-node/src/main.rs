//! gossip-node binary entry point.
//!
//! Usage:
//! ```bash
//! gossip-node --config gossip.toml
//! gossip-node --port 7401 --peer 127.0.0.1:7400 --put greeting='"hello"'
//! gossip-node --help
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use gossip_node::{Config, Node};
use gossip_types::{NodeAddr, Payload, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Epidemic gossip node.
#[derive(Parser, Debug)]
#[command(name = "gossip-node")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Host to bind and advertise (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind and advertise (overrides config)
    #[arg(long, short)]
    port: Option<u16>,

    /// Additional seed peer as host:port (repeatable)
    #[arg(long = "peer")]
    peers: Vec<NodeAddr>,

    /// Key to infect the cluster with on startup, as key=json (repeatable)
    #[arg(long = "put", value_parser = parse_put)]
    puts: Vec<(String, Value)>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(host) = cli.host {
        config.node.host = host;
    }
    if let Some(port) = cli.port {
        config.node.port = port;
    }
    config.node.peers.extend(cli.peers);

    tracing::info!(
        "gossip-node v{} at {} with {} seed peer(s)",
        env!("CARGO_PKG_VERSION"),
        config.address(),
        config.node.peers.len()
    );

    let node = Node::new(config);
    let listener = node.bind().await.context("Failed to bind listener")?;
    let server = tokio::spawn(node.clone().serve(listener));

    if !cli.puts.is_empty() {
        let payload: Payload = cli.puts.into_iter().collect();
        node.infect(payload).await;
    }

    tokio::select! {
        result = server => {
            result.context("Server task failed")??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down {}", node.address());
        }
    }

    Ok(())
}

/// Parse `key=json`. A value that is not valid JSON is taken as a string.
fn parse_put(arg: &str) -> std::result::Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{arg}'"))?;
    if key.is_empty() {
        return Err("key must not be empty".to_string());
    }
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from(json),
        Err(_) => Value::from(raw),
    };
    Ok((key.to_string(), value))
}
