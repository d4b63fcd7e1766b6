//! # Prometheus Metrics
//!
//! Per-peer gossip metrics, served at `/metrics` on each peer's HTTP
//! endpoint.
//!
//! The protocol crate keeps its own atomic counters ([`GossipStats`]) and
//! knows nothing about Prometheus. Each scrape copies the latest values
//! into the registry first, so the exposition is never staler than the
//! request.
//!
//! [`GossipStats`]: gossipnet_protocol::network::GossipStats

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

use gossipnet_protocol::network::NodeState;

use crate::api::AppState;

/// Metric handles for one peer.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    pub transactions_sent_total: IntCounter,
    pub transactions_accepted_total: IntCounter,
    pub transactions_rejected_total: IntCounter,
    pub announcements_sent_total: IntCounter,
    pub announcements_merged_total: IntCounter,
    pub announcements_rejected_total: IntCounter,
    pub send_failures_total: IntCounter,
    pub malformed_frames_total: IntCounter,
    pub neighbors: IntGauge,
    pub topology_nodes: IntGauge,
    pub topology_edges: IntGauge,
    pub transaction_log_entries: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let c = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, prometheus::Error> {
    let g = IntGauge::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

/// Advance a counter to `value`. Counters only move forward.
fn sync_counter(counter: &IntCounter, value: u64) {
    let current = counter.get();
    if value > current {
        counter.inc_by(value - current);
    }
}

impl NodeMetrics {
    /// Create a registry labelled with `peer` and register every metric.
    pub fn new(peer: &str) -> Result<Self, prometheus::Error> {
        let labels = [("peer".to_string(), peer.to_string())].into_iter().collect();
        let registry = Registry::new_custom(Some("gossipnet".into()), Some(labels))?;

        Ok(Self {
            transactions_sent_total: counter(
                &registry,
                "transactions_sent_total",
                "Transactions this peer signed and sent",
            )?,
            transactions_accepted_total: counter(
                &registry,
                "transactions_accepted_total",
                "Received transactions that verified and were logged",
            )?,
            transactions_rejected_total: counter(
                &registry,
                "transactions_rejected_total",
                "Received transactions dropped by verification",
            )?,
            announcements_sent_total: counter(
                &registry,
                "announcements_sent_total",
                "Peer-list announcements sent",
            )?,
            announcements_merged_total: counter(
                &registry,
                "announcements_merged_total",
                "Peer-list announcements merged into the topology",
            )?,
            announcements_rejected_total: counter(
                &registry,
                "announcements_rejected_total",
                "Peer-list announcements dropped as malformed",
            )?,
            send_failures_total: counter(
                &registry,
                "send_failures_total",
                "Sends the transport refused",
            )?,
            malformed_frames_total: counter(
                &registry,
                "malformed_frames_total",
                "Inbound frames that failed to decode",
            )?,
            neighbors: gauge(&registry, "neighbors", "Current direct neighbors")?,
            topology_nodes: gauge(&registry, "topology_nodes", "Nodes in the known topology")?,
            topology_edges: gauge(&registry, "topology_edges", "Edges in the known topology")?,
            transaction_log_entries: gauge(
                &registry,
                "transaction_log_entries",
                "Entries currently held in the transaction log",
            )?,
            registry,
        })
    }

    /// Copy current values out of the node state.
    pub fn refresh(&self, state: &NodeState) {
        let stats = state.stats().snapshot();
        sync_counter(&self.transactions_sent_total, stats.transactions_sent);
        sync_counter(&self.transactions_accepted_total, stats.transactions_accepted);
        sync_counter(&self.transactions_rejected_total, stats.transactions_rejected);
        sync_counter(&self.announcements_sent_total, stats.announcements_sent);
        sync_counter(&self.announcements_merged_total, stats.announcements_merged);
        sync_counter(&self.announcements_rejected_total, stats.announcements_rejected);
        sync_counter(&self.send_failures_total, stats.send_failures);
        sync_counter(&self.malformed_frames_total, stats.malformed_frames);

        let topology = state.known_topology();
        self.neighbors.set(state.neighbors().len() as i64);
        self.topology_nodes.set(topology.node_count() as i64);
        self.topology_edges.set(topology.edge_count() as i64);
        self.transaction_log_entries.set(state.log().len() as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics`: refresh from node state, then render.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.refresh(&state.node);
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
