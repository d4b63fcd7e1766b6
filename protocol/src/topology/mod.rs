//! # Topology Module
//!
//! Each node's gossiped picture of the network: which peers exist and who
//! is connected to whom. See [`store`] for the merge rules.

pub mod store;
pub mod types;

pub use store::{KnownTopology, MergeOutcome};
pub use types::{ConnectionKey, NodeColor, TopologyEdge, TopologyNode, TopologySnapshot};
