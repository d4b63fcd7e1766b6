//! # CLI Interface
//!
//! Defines the command-line argument structure for `gossipnet-node` using
//! `clap` derive. Three subcommands: `simulate`, `keygen`, and `version`.
//! Every `simulate` flag can also come from a `GOSSIPNET_*` environment
//! variable.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use gossipnet_protocol::config::{
    GossipConfig, TOPOLOGY_GOSSIP_INTERVAL, TRANSACTION_GOSSIP_INTERVAL, TRANSACTION_LOG_CAPACITY,
};

use crate::logging::LogFormat;

/// gossipnet peer-to-peer gossip node.
///
/// Runs a set of gossiping peers in one process, each with its own
/// identity, topology view, and transaction log, plus an HTTP endpoint per
/// peer for watching them converge.
#[derive(Parser, Debug)]
#[command(
    name = "gossipnet-node",
    about = "gossipnet peer-to-peer gossip node",
    version,
    propagate_version = true
)]
pub struct GossipnetCli {
    /// Log output format.
    #[arg(long, global = true, env = "GOSSIPNET_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Spawn a set of gossiping peers connected over an in-process network.
    Simulate(SimulateArgs),
    /// Generate a node keypair and print its peer id.
    Keygen(KeygenArgs),
    /// Print version information and exit.
    Version,
}

/// How simulated peers are linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Layout {
    /// Every peer linked to every other peer.
    Full,
    /// Each peer linked to its two neighbors, wrapping around.
    Ring,
    /// Like `ring` without the wrap-around link.
    Line,
}

impl Layout {
    /// Index pairs to link for `count` peers.
    pub fn links(self, count: usize) -> Vec<(usize, usize)> {
        match self {
            Layout::Full => (0..count)
                .flat_map(|i| (i + 1..count).map(move |j| (i, j)))
                .collect(),
            Layout::Line => (1..count).map(|i| (i - 1, i)).collect(),
            Layout::Ring => {
                let mut links = Layout::Line.links(count);
                if count > 2 {
                    links.push((count - 1, 0));
                }
                links
            }
        }
    }
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Number of peers to spawn.
    #[arg(long, short = 'n', env = "GOSSIPNET_NODES", default_value_t = 4,
          value_parser = clap::value_parser!(u16).range(1..=256))]
    pub nodes: u16,

    /// Link layout between peers.
    #[arg(long, env = "GOSSIPNET_LAYOUT", value_enum, default_value_t = Layout::Full)]
    pub layout: Layout,

    /// Stop after this many seconds. Runs until Ctrl+C when omitted.
    #[arg(long, env = "GOSSIPNET_RUNTIME_SECS")]
    pub runtime_secs: Option<u64>,

    /// Milliseconds between transaction gossip ticks.
    #[arg(long, env = "GOSSIPNET_TX_INTERVAL_MS",
          default_value_t = TRANSACTION_GOSSIP_INTERVAL.as_millis() as u64)]
    pub tx_interval_ms: u64,

    /// Milliseconds between topology gossip ticks.
    #[arg(long, env = "GOSSIPNET_TOPOLOGY_INTERVAL_MS",
          default_value_t = TOPOLOGY_GOSSIP_INTERVAL.as_millis() as u64)]
    pub topology_interval_ms: u64,

    /// Transactions kept per peer log.
    #[arg(long, env = "GOSSIPNET_LOG_CAPACITY", default_value_t = TRANSACTION_LOG_CAPACITY)]
    pub log_capacity: usize,

    /// Accept transactions whose public key does not hash to the sender id.
    #[arg(long, env = "GOSSIPNET_ALLOW_UNBOUND_KEYS")]
    pub allow_unbound_keys: bool,

    /// Address the per-peer HTTP endpoints bind to.
    #[arg(long, env = "GOSSIPNET_API_HOST", default_value = "127.0.0.1")]
    pub api_host: String,

    /// Port of peer 0's HTTP endpoint. Peer `i` listens on `base + i`.
    #[arg(long, env = "GOSSIPNET_API_BASE_PORT", default_value_t = 8080)]
    pub api_base_port: u16,

    /// Do not start HTTP endpoints.
    #[arg(long, env = "GOSSIPNET_NO_API")]
    pub no_api: bool,
}

impl SimulateArgs {
    pub fn gossip_config(&self) -> GossipConfig {
        GossipConfig {
            transaction_interval: Duration::from_millis(self.tx_interval_ms),
            topology_interval: Duration::from_millis(self.topology_interval_ms),
            log_capacity: self.log_capacity,
            require_sender_binding: !self.allow_unbound_keys,
            runtime: self.runtime_secs.map(Duration::from_secs),
            ..GossipConfig::default()
        }
    }
}

#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Write the hex secret key to this file (mode 0600 on Unix).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        GossipnetCli::command().debug_assert();
    }

    #[test]
    fn simulate_defaults_match_protocol_config() {
        let cli = GossipnetCli::try_parse_from(["gossipnet-node", "simulate"]).unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.nodes, 4);
        assert_eq!(args.layout, Layout::Full);
        assert_eq!(args.gossip_config(), GossipConfig::default());
    }

    #[test]
    fn simulate_flags_override_config() {
        let cli = GossipnetCli::try_parse_from([
            "gossipnet-node",
            "--log-format",
            "json",
            "simulate",
            "-n",
            "3",
            "--layout",
            "ring",
            "--runtime-secs",
            "900",
            "--tx-interval-ms",
            "250",
            "--allow-unbound-keys",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let config = args.gossip_config();
        assert_eq!(config.transaction_interval, Duration::from_millis(250));
        assert_eq!(config.runtime, Some(Duration::from_secs(900)));
        assert!(!config.require_sender_binding);
        assert_eq!(args.layout, Layout::Ring);
    }

    #[test]
    fn rejects_zero_nodes() {
        assert!(GossipnetCli::try_parse_from(["gossipnet-node", "simulate", "-n", "0"]).is_err());
    }

    #[test]
    fn layout_links() {
        assert_eq!(Layout::Full.links(3), vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(Layout::Line.links(3), vec![(0, 1), (1, 2)]);
        assert_eq!(Layout::Ring.links(4), vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
        assert_eq!(Layout::Ring.links(2), vec![(0, 1)]);
        assert!(Layout::Full.links(1).is_empty());
        assert_eq!(Layout::Full.links(5).len(), 10);
    }
}
