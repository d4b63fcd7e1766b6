//! Known-topology store and the announcement merge.
//!
//! Each node keeps its own picture of the network, built only from peer-list
//! announcements it receives. Transport membership events never touch it;
//! the graph shows what has been gossiped, not what the socket layer sees.
//!
//! ## Merge rules
//!
//! Given an announcement from `S` naming `{P1..Pn}`:
//!
//! 1. Upsert `S` (refresh `last_seen`).
//! 2. Upsert every `Pi`.
//! 3. For every `Pi`, add edge `S -- Pi` unless the unordered pair is
//!    already known.
//!
//! Edges are idempotent, node metadata is not: re-applying an announcement
//! leaves the edge list alone and advances `last_seen`. An existing edge's
//! `last_updated` is never refreshed.
//!
//! The graph only grows. It is bounded by the number of peers ever
//! announced.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::trace;

use super::types::{ConnectionKey, NodeColor, TopologyEdge, TopologyNode, TopologySnapshot};
use crate::identity::PeerId;

/// What a single merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub new_nodes: usize,
    pub new_edges: usize,
}

#[derive(Debug)]
struct TopologyInner {
    nodes: HashMap<PeerId, TopologyNode>,
    edges: Vec<TopologyEdge>,
    seen_connection_keys: HashSet<ConnectionKey>,
    version: u64,
}

impl TopologyInner {
    /// Insert or refresh a node. Returns true if it was new.
    fn upsert(&mut self, id: PeerId, local_id: &PeerId, now: DateTime<Utc>) -> bool {
        let color = NodeColor::for_peer(&id, local_id);
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.last_seen = now;
                node.color = color;
                node.label = id.short();
                false
            }
            None => {
                self.nodes.insert(id, TopologyNode::new(id, color, now));
                true
            }
        }
    }
}

/// A node's view of the network graph.
#[derive(Debug)]
pub struct KnownTopology {
    local_id: PeerId,
    inner: RwLock<TopologyInner>,
}

impl KnownTopology {
    /// Create a store already containing the local node.
    pub fn new(local_id: PeerId) -> Self {
        Self::new_at(local_id, Utc::now())
    }

    pub fn new_at(local_id: PeerId, now: DateTime<Utc>) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(local_id, TopologyNode::new(local_id, NodeColor::Local, now));
        Self {
            local_id,
            inner: RwLock::new(TopologyInner {
                nodes,
                edges: Vec::new(),
                seen_connection_keys: HashSet::new(),
                version: 0,
            }),
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    /// Apply a peer-list announcement from `sender`.
    ///
    /// A peer naming itself adds no edge.
    pub fn merge_announcement(
        &self,
        sender: &PeerId,
        peers: &[PeerId],
        now: DateTime<Utc>,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut inner = self.inner.write();

        if inner.upsert(*sender, &self.local_id, now) {
            outcome.new_nodes += 1;
        }

        for peer in peers {
            if inner.upsert(*peer, &self.local_id, now) {
                outcome.new_nodes += 1;
            }
        }

        for peer in peers {
            if peer == sender {
                continue;
            }
            let key = ConnectionKey::new(*sender, *peer);
            if inner.seen_connection_keys.insert(key) {
                inner.edges.push(TopologyEdge {
                    source: *sender,
                    target: *peer,
                    last_updated: now,
                });
                outcome.new_edges += 1;
            }
        }

        inner.version += 1;
        trace!(
            sender = %sender.short(),
            peers = peers.len(),
            new_nodes = outcome.new_nodes,
            new_edges = outcome.new_edges,
            "merged announcement"
        );
        outcome
    }

    /// Consistent copy of the graph.
    pub fn snapshot(&self) -> TopologySnapshot {
        let inner = self.inner.read();
        let mut nodes: Vec<TopologyNode> = inner.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        TopologySnapshot {
            version: inner.version,
            nodes,
            edges: inner.edges.clone(),
        }
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().edges.len()
    }

    pub fn node(&self, id: &PeerId) -> Option<TopologyNode> {
        self.inner.read().nodes.get(id).cloned()
    }

    pub fn has_edge(&self, a: &PeerId, b: &PeerId) -> bool {
        self.inner
            .read()
            .seen_connection_keys
            .contains(&ConnectionKey::new(*a, *b))
    }
}
