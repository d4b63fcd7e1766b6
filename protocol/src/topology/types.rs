//! Topology graph value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::PeerId;

/// Display color of a node. Serialized as the CSS color the graph view
/// paints it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeColor {
    /// The node owning this topology.
    #[serde(rename = "green")]
    Local,
    /// Everyone else.
    #[serde(rename = "blue")]
    Remote,
}

impl NodeColor {
    pub fn for_peer(id: &PeerId, local_id: &PeerId) -> Self {
        if id == local_id {
            Self::Local
        } else {
            Self::Remote
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyNode {
    pub id: PeerId,
    pub label: String,
    pub color: NodeColor,
    pub last_seen: DateTime<Utc>,
}

impl TopologyNode {
    pub fn new(id: PeerId, color: NodeColor, last_seen: DateTime<Utc>) -> Self {
        Self {
            id,
            label: id.short(),
            color,
            last_seen,
        }
    }
}

/// An undirected link. `source`/`target` record who announced it first,
/// nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyEdge {
    pub source: PeerId,
    pub target: PeerId,
    pub last_updated: DateTime<Utc>,
}

impl TopologyEdge {
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(self.source, self.target)
    }
}

/// Unordered peer pair, stored sorted so `(a, b)` and `(b, a)` are the same
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    low: PeerId,
    high: PeerId,
}

impl ConnectionKey {
    pub fn new(a: PeerId, b: PeerId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> &PeerId {
        &self.low
    }

    pub fn high(&self) -> &PeerId {
        &self.high
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.low == *id || self.high == *id
    }
}

/// Copy of a topology at one version.
///
/// Serializes as `{"version", "nodes", "links"}`, the shape the graph view
/// consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub version: u64,
    /// Sorted by id.
    pub nodes: Vec<TopologyNode>,
    /// In discovery order.
    #[serde(rename = "links")]
    pub edges: Vec<TopologyEdge>,
}

impl TopologySnapshot {
    pub fn node(&self, id: &PeerId) -> Option<&TopologyNode> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    pub fn has_edge(&self, a: &PeerId, b: &PeerId) -> bool {
        let key = ConnectionKey::new(*a, *b);
        self.edges.iter().any(|e| e.key() == key)
    }
}
