//! # Network Module
//!
//! Gossip networking for gossipnet: the wire format, the transport contract
//! the node consumes, an in-process transport, and the node runtime that
//! ties them to the topology store and transaction log.
//!
//! ## Architecture
//!
//! ```text
//! message.rs    Wire envelope, tagged payloads, bincode framing
//! transport.rs  Transport trait and inbound event type
//! local.rs      In-memory transport hub for simulations and tests
//! dispatch.rs   Payload kind -> handler table
//! gossip.rs     Tick bodies, inbound handlers, shared NodeState
//! node.rs       GossipNode runtime loop
//! ```
//!
//! ## Design Decisions
//!
//! - Sends are one-way and best-effort. `Transport::send` is synchronous
//!   and only enqueues; there are no acks and no retries.
//! - One loop per node. Both schedulers and inbound dispatch share it, so
//!   node state has a single writer.
//! - Shared state sits behind `parking_lot::RwLock`. Observers copy out a
//!   snapshot under the read lock and never iterate live structures.
//! - The protocol crate stays transport-agnostic. Anything that can list
//!   neighbors and push a frame can host a node.

pub mod dispatch;
pub mod gossip;
pub mod local;
pub mod message;
pub mod node;
pub mod transport;

pub use dispatch::{DispatchTable, PayloadHandler};
pub use gossip::{GossipStats, GossipStatsSnapshot, NodeState};
pub use local::{LocalNetwork, LocalTransport};
pub use message::{MessageError, Payload, PayloadKind, PeerListAnnouncement, WireMessage};
pub use node::{GossipNode, NodeError, StopReason};
pub use transport::{InboundEvents, Transport, TransportError, TransportEvent};
