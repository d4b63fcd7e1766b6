//! # Observability API
//!
//! Builds the axum router that exposes one simulated peer over HTTP. All
//! handlers read from the peer's shared [`NodeState`]; none of them write.
//!
//! ## Endpoints
//!
//! | Method | Path                 | Description                              |
//! |--------|----------------------|------------------------------------------|
//! | GET    | `/health`            | Liveness probe                           |
//! | GET    | `/status`            | Peer status summary                      |
//! | GET    | `/api/topology`      | Gossiped topology (nodes + links)        |
//! | GET    | `/api/neighbors`     | Direct view: this peer and its neighbors |
//! | GET    | `/api/transactions`  | `{"transactions": [...]}`, `?limit=` (default 10) |
//! | GET    | `/ws`                | WebSocket push of topology changes       |
//! | GET    | `/metrics`           | Prometheus exposition                    |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use gossipnet_protocol::config::RECENT_TRANSACTIONS_LIMIT;
use gossipnet_protocol::network::{GossipStatsSnapshot, NodeState};
use gossipnet_protocol::topology::{NodeColor, TopologyEdge, TopologyNode, TopologySnapshot};
use gossipnet_protocol::transaction::TransactionLogEntry;

use crate::metrics::{metrics_handler, SharedMetrics};

/// How often a WebSocket connection checks for a new topology version.
const WS_POLL_INTERVAL: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub node: Arc<NodeState>,
    pub metrics: SharedMetrics,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(version: impl Into<String>, node: Arc<NodeState>, metrics: SharedMetrics) -> Self {
        Self {
            version: version.into(),
            node,
            metrics,
            started_at: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/api/topology", get(topology_handler))
        .route("/api/neighbors", get(neighbors_handler))
        .route("/api/transactions", get(transactions_handler))
        .route("/ws", get(ws_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    /// Full hex peer id.
    pub peer_id: String,
    /// Short display label.
    pub label: String,
    pub neighbors: usize,
    pub topology_version: u64,
    pub topology_nodes: usize,
    pub topology_edges: usize,
    /// Entries currently retained in the log.
    pub transactions_logged: usize,
    /// Entries ever recorded, including evicted ones.
    pub transactions_recorded: u64,
    pub uptime_secs: u64,
    pub stats: GossipStatsSnapshot,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /api/neighbors`. Same shape as the gossiped
/// topology, built from the transport's neighbor list instead.
#[derive(Debug, Serialize, Deserialize)]
pub struct NeighborView {
    pub nodes: Vec<TopologyNode>,
    pub links: Vec<TopologyEdge>,
}

/// Response payload for `GET /api/transactions`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionsResponse {
    /// Oldest first.
    pub transactions: Vec<TransactionLogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let node = &state.node;
    let topology = node.topology();
    let id = node.local_id();

    Json(StatusResponse {
        version: state.version.clone(),
        peer_id: id.to_hex(),
        label: id.short(),
        neighbors: node.neighbors().len(),
        topology_version: topology.version,
        topology_nodes: topology.nodes.len(),
        topology_edges: topology.edges.len(),
        transactions_logged: node.log().len(),
        transactions_recorded: node.log().total_recorded(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        stats: node.stats().snapshot(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// `GET /api/topology`
async fn topology_handler(State(state): State<AppState>) -> Json<TopologySnapshot> {
    Json(state.node.topology())
}

/// `GET /api/neighbors`
async fn neighbors_handler(State(state): State<AppState>) -> Json<NeighborView> {
    Json(neighbor_view(&state.node))
}

/// `GET /api/transactions?limit=N`
async fn transactions_handler(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> Json<TransactionsResponse> {
    let limit = query.limit.unwrap_or(RECENT_TRANSACTIONS_LIMIT);
    Json(TransactionsResponse {
        transactions: state.node.recent_transactions(limit),
    })
}

fn neighbor_view(node: &NodeState) -> NeighborView {
    let local = *node.local_id();
    let now = Utc::now();
    let neighbors = node.neighbors();

    let mut nodes = Vec::with_capacity(neighbors.len() + 1);
    nodes.push(TopologyNode::new(local, NodeColor::Local, now));
    nodes.extend(
        neighbors
            .iter()
            .map(|peer| TopologyNode::new(*peer, NodeColor::Remote, now)),
    );

    let links = neighbors
        .iter()
        .map(|peer| TopologyEdge {
            source: local,
            target: *peer,
            last_updated: now,
        })
        .collect();

    NeighborView { nodes, links }
}

/// `GET /ws`: pushes the gossiped topology as JSON on connect and after
/// every version change. Client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut poll = tokio::time::interval(WS_POLL_INTERVAL);
    let mut last_version = None;

    loop {
        tokio::select! {
            _ = poll.tick() => {
                if last_version == Some(state.node.known_topology().version()) {
                    continue;
                }
                let snapshot = state.node.topology();
                let payload = match serde_json::to_string(&snapshot) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::warn!("failed to serialize topology for ws: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
                last_version = Some(snapshot.version);
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
