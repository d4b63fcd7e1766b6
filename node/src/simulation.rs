//! # In-process Simulation
//!
//! Spawns `n` gossip peers on one [`LocalNetwork`], links them according to
//! a [`Layout`](crate::cli::Layout), and gives each its own HTTP endpoint on
//! `api_base_port + i`. Everything shares one tokio runtime.
//!
//! The run ends when every peer loop has returned (runtime elapsed) or the
//! caller's shutdown future resolves, whichever is first. Peers and HTTP
//! servers all watch the same `watch` channel, so one send stops them all.

use anyhow::{Context, Result};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

use gossipnet_protocol::crypto::keys::NodeKeypair;
use gossipnet_protocol::identity::PeerId;
use gossipnet_protocol::network::{GossipNode, GossipStatsSnapshot, LocalNetwork, NodeState, StopReason};

use crate::api::{self, AppState};
use crate::cli::SimulateArgs;
use crate::metrics::NodeMetrics;

/// End-of-run state of one peer.
#[derive(Debug, Clone)]
pub struct PeerReport {
    pub label: String,
    pub reason: Option<StopReason>,
    pub topology_nodes: usize,
    pub topology_edges: usize,
    pub transactions_logged: usize,
    pub stats: GossipStatsSnapshot,
}

impl PeerReport {
    fn new(state: &NodeState, reason: Option<StopReason>) -> Self {
        let topology = state.known_topology();
        Self {
            label: state.local_id().short(),
            reason,
            topology_nodes: topology.node_count(),
            topology_edges: topology.edge_count(),
            transactions_logged: state.log().len(),
            stats: state.stats().snapshot(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub peers: Vec<PeerReport>,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation finished with {} peer(s).", self.peers.len())?;
        writeln!(
            f,
            "  {:<8} {:>6} {:>6} {:>6} {:>8} {:>8}  {}",
            "peer", "nodes", "links", "log", "sent", "recv", "stopped"
        )?;
        for peer in &self.peers {
            let reason = match peer.reason {
                Some(reason) => format!("{reason:?}"),
                None => "aborted".to_string(),
            };
            writeln!(
                f,
                "  {:<8} {:>6} {:>6} {:>6} {:>8} {:>8}  {}",
                peer.label,
                peer.topology_nodes,
                peer.topology_edges,
                peer.transactions_logged,
                peer.stats.transactions_sent,
                peer.stats.transactions_accepted,
                reason
            )?;
        }
        Ok(())
    }
}

/// Bind address of peer `index`'s HTTP endpoint.
pub fn api_addr(host: &str, base_port: u16, index: usize) -> Result<String> {
    let port = u16::try_from(base_port as usize + index)
        .with_context(|| format!("API port for peer {index} exceeds 65535 (base {base_port})"))?;
    Ok(format!("{host}:{port}"))
}

/// Run a simulation until all peers stop or `shutdown` resolves.
pub async fn run_simulation<F>(args: &SimulateArgs, shutdown: F) -> Result<SimulationReport>
where
    F: Future<Output = ()>,
{
    let config = args.gossip_config();
    let count = args.nodes as usize;
    let version = format!(
        "{} (protocol {})",
        env!("CARGO_PKG_VERSION"),
        gossipnet_protocol::config::PROTOCOL_VERSION,
    );

    tracing::info!(
        nodes = count,
        layout = ?args.layout,
        runtime_secs = args.runtime_secs,
        api = !args.no_api,
        "starting simulation"
    );

    let network = LocalNetwork::new();
    let keypairs: Vec<NodeKeypair> = (0..count).map(|_| NodeKeypair::generate()).collect();
    let ids: Vec<PeerId> = keypairs
        .iter()
        .map(|kp| PeerId::from_public_key(&kp.public_key()))
        .collect();

    let mut registered = Vec::with_capacity(count);
    for id in &ids {
        registered.push(network.register(*id));
    }
    for (a, b) in args.layout.links(count) {
        network
            .connect(&ids[a], &ids[b])
            .with_context(|| format!("failed to link peer {a} to peer {b}"))?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut states: Vec<Arc<NodeState>> = Vec::with_capacity(count);
    let mut nodes = JoinSet::new();
    let mut servers = JoinSet::new();

    for (index, (keypair, (transport, inbound))) in keypairs.into_iter().zip(registered).enumerate() {
        let node = GossipNode::new(keypair, transport, config.clone())
            .with_context(|| format!("failed to create peer {index}"))?;
        let state = node.state();
        let label = state.local_id().short();

        if !args.no_api {
            let metrics = Arc::new(
                NodeMetrics::new(&label).context("failed to register metrics")?,
            );
            let router = api::create_router(AppState::new(version.clone(), Arc::clone(&state), metrics));
            let addr = api_addr(&args.api_host, args.api_base_port, index)?;
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind API listener on {addr}"))?;
            tracing::info!(peer = %label, "API listening on http://{}", addr);

            let mut stop = shutdown_rx.clone();
            servers.spawn(async move {
                let graceful = async move {
                    let _ = stop.wait_for(|stopped| *stopped).await;
                };
                if let Err(e) = axum::serve(listener, router)
                    .with_graceful_shutdown(graceful)
                    .await
                {
                    tracing::error!(peer = %label, "API server error: {}", e);
                }
            });
        }

        let stop = shutdown_rx.clone();
        nodes.spawn(async move { (index, node.run(inbound, stop).await) });
        states.push(state);
    }

    let mut reasons: Vec<Option<StopReason>> = vec![None; count];
    let all_stopped = async {
        while let Some(joined) = nodes.join_next().await {
            match joined {
                Ok((index, reason)) => reasons[index] = Some(reason),
                Err(e) => tracing::error!("peer task failed: {}", e),
            }
        }
    };

    tokio::select! {
        _ = all_stopped => {
            tracing::info!("all peers stopped");
        }
        _ = shutdown => {
            tracing::info!("shutdown signal received, stopping peers");
        }
    }

    let _ = shutdown_tx.send(true);
    while let Some(joined) = nodes.join_next().await {
        match joined {
            Ok((index, reason)) => reasons[index] = Some(reason),
            Err(e) => tracing::error!("peer task failed: {}", e),
        }
    }
    while servers.join_next().await.is_some() {}

    let peers = states
        .iter()
        .zip(reasons)
        .map(|(state, reason)| PeerReport::new(state, reason))
        .collect();
    Ok(SimulationReport { peers })
}
