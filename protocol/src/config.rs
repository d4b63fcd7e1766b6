//! # Protocol Configuration & Constants
//!
//! Every magic number in gossipnet lives here. If you're hardcoding a
//! gossip interval somewhere else, you're doing it wrong and you owe the
//! team coffee.
//!
//! Two nodes only interoperate if they agree on the wire constants
//! (`COMMUNITY_ID`, `WIRE_PROTOCOL_VERSION`, `PEER_LIST_DELIMITER`). The
//! timing constants are local policy and can differ per node.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Identity
// ---------------------------------------------------------------------------

/// Community identifier. Frames from a different community are rejected
/// before any field is inspected.
pub const COMMUNITY_ID: &[u8; 20] = b"myblockchain-test-01";

/// Crate version string, kept here so the binary can report it without
/// reaching into Cargo metadata.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Wire protocol version carried in every frame. Bump when the field order
/// or type of either payload changes.
pub const WIRE_PROTOCOL_VERSION: u16 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 for every signature in the protocol.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Public (verifying) key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Length of a peer identifier: a BLAKE3 digest of the verifying key.
pub const PEER_ID_LENGTH: usize = 32;

/// Number of hex characters shown when a peer id is rendered for humans.
/// Display only. Never compare prefixes.
pub const PEER_PREFIX_LENGTH: usize = 6;

// ---------------------------------------------------------------------------
// Timing Constants
// ---------------------------------------------------------------------------

/// How often a node fabricates and unicasts one transaction.
pub const TRANSACTION_GOSSIP_INTERVAL: Duration = Duration::from_secs(5);

/// How often a node pushes its neighbor list to every neighbor. Faster than
/// the transaction cadence so the topology view stays live.
pub const TOPOLOGY_GOSSIP_INTERVAL: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Transaction Parameters
// ---------------------------------------------------------------------------

/// Smallest amount a generated transaction may carry.
pub const MIN_AMOUNT: u32 = 1;

/// Largest amount a generated transaction may carry (inclusive).
pub const MAX_AMOUNT: u32 = 100;

/// How many log entries the observability surface returns by default.
pub const RECENT_TRANSACTIONS_LIMIT: usize = 10;

/// How many log entries a node retains before dropping the oldest. The log
/// is observational, so this only bounds memory.
pub const TRANSACTION_LOG_CAPACITY: usize = 1_000;

// ---------------------------------------------------------------------------
// Wire Format
// ---------------------------------------------------------------------------

/// Separator between hex peer ids in a peer-list announcement.
pub const PEER_LIST_DELIMITER: char = ',';

/// Upper bound on an encoded frame. Anything larger is treated as malformed.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Per-node gossip policy.
///
/// Defaults mirror the constants above. Tests usually shrink the intervals
/// or drive ticks by hand instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipConfig {
    /// Period of the transaction gossip scheduler.
    pub transaction_interval: Duration,
    /// Delay before the first transaction tick.
    pub transaction_initial_delay: Duration,
    /// Period of the topology gossip scheduler.
    pub topology_interval: Duration,
    /// Delay before the first topology tick.
    pub topology_initial_delay: Duration,
    /// Number of log entries retained in memory.
    pub log_capacity: usize,
    /// Reject transactions whose attached public key does not hash to the
    /// claimed sender.
    pub require_sender_binding: bool,
    /// Stop the node after this long. `None` runs until shutdown is signalled.
    pub runtime: Option<Duration>,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            transaction_interval: TRANSACTION_GOSSIP_INTERVAL,
            transaction_initial_delay: Duration::ZERO,
            topology_interval: TOPOLOGY_GOSSIP_INTERVAL,
            topology_initial_delay: Duration::ZERO,
            log_capacity: TRANSACTION_LOG_CAPACITY,
            require_sender_binding: true,
            runtime: None,
        }
    }
}
