//! # Gossip Protocol
//!
//! The two gossip behaviours and their inbound counterparts:
//!
//! - **Transaction gossip**: each tick, sign a random-amount transaction to
//!   one randomly chosen neighbor and log the intent locally.
//! - **Topology gossip**: each tick, announce the current neighbor list to
//!   *every* neighbor. Topology spreads densely so every node's graph stays
//!   live; transactions spread thinly.
//!
//! Received transactions are verified and logged, never forwarded. A
//! transaction therefore travels at most one hop from its signer.
//!
//! Nothing here is fatal. A failed send is counted and logged, a bad
//! payload is counted and dropped, and an empty neighbor set is just a
//! quiet tick.
//!
//! State shared with observers lives in [`NodeState`]. Every read goes
//! through a snapshot so an observer never sees a half-applied merge.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::message::{MessageError, PeerListAnnouncement, WireMessage};
use super::transport::Transport;
use crate::config::{MAX_AMOUNT, MIN_AMOUNT};
use crate::crypto::keys::NodeKeypair;
use crate::identity::PeerId;
use crate::topology::{KnownTopology, MergeOutcome, TopologySnapshot};
use crate::transaction::{
    current_timestamp, sign_transaction, verify_transaction, Transaction, TransactionError,
    TransactionLog, TransactionLogEntry, TransactionLogSnapshot,
};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Monotonic gossip counters. Cheap to bump from the loop, cheap to read
/// from anywhere.
#[derive(Debug, Default)]
pub struct GossipStats {
    transactions_sent: AtomicU64,
    transactions_accepted: AtomicU64,
    transactions_rejected: AtomicU64,
    announcements_sent: AtomicU64,
    announcements_merged: AtomicU64,
    announcements_rejected: AtomicU64,
    send_failures: AtomicU64,
    malformed_frames: AtomicU64,
    unhandled_payloads: AtomicU64,
    idle_ticks: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipStatsSnapshot {
    pub transactions_sent: u64,
    pub transactions_accepted: u64,
    pub transactions_rejected: u64,
    pub announcements_sent: u64,
    pub announcements_merged: u64,
    pub announcements_rejected: u64,
    pub send_failures: u64,
    pub malformed_frames: u64,
    pub unhandled_payloads: u64,
    pub idle_ticks: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl GossipStats {
    pub(crate) fn record_malformed_frame(&self) {
        bump(&self.malformed_frames);
    }

    pub(crate) fn record_unhandled_payload(&self) {
        bump(&self.unhandled_payloads);
    }

    pub fn snapshot(&self) -> GossipStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        GossipStatsSnapshot {
            transactions_sent: load(&self.transactions_sent),
            transactions_accepted: load(&self.transactions_accepted),
            transactions_rejected: load(&self.transactions_rejected),
            announcements_sent: load(&self.announcements_sent),
            announcements_merged: load(&self.announcements_merged),
            announcements_rejected: load(&self.announcements_rejected),
            send_failures: load(&self.send_failures),
            malformed_frames: load(&self.malformed_frames),
            unhandled_payloads: load(&self.unhandled_payloads),
            idle_ticks: load(&self.idle_ticks),
        }
    }
}

// ---------------------------------------------------------------------------
// Node state
// ---------------------------------------------------------------------------

/// Everything a node knows that observers may read: its topology, its
/// transaction log, counters, and the last neighbor list it saw.
///
/// Shared as `Arc<NodeState>`. The gossip loop is the only writer.
#[derive(Debug)]
pub struct NodeState {
    local_id: PeerId,
    topology: KnownTopology,
    transactions: TransactionLog,
    stats: GossipStats,
    neighbors: RwLock<Vec<PeerId>>,
}

impl NodeState {
    pub fn new(local_id: PeerId, log_capacity: usize) -> Self {
        Self {
            local_id,
            topology: KnownTopology::new(local_id),
            transactions: TransactionLog::new(log_capacity),
            stats: GossipStats::default(),
            neighbors: RwLock::new(Vec::new()),
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    /// Snapshot of the gossiped topology graph.
    pub fn topology(&self) -> TopologySnapshot {
        self.topology.snapshot()
    }

    /// The last `limit` logged transactions, oldest first.
    pub fn recent_transactions(&self, limit: usize) -> Vec<TransactionLogEntry> {
        self.transactions.recent(limit)
    }

    pub fn transaction_log(&self) -> TransactionLogSnapshot {
        self.transactions.snapshot()
    }

    pub fn known_topology(&self) -> &KnownTopology {
        &self.topology
    }

    pub fn log(&self) -> &TransactionLog {
        &self.transactions
    }

    pub fn stats(&self) -> &GossipStats {
        &self.stats
    }

    /// Direct neighbors as of the last tick or membership change.
    pub fn neighbors(&self) -> Vec<PeerId> {
        self.neighbors.read().clone()
    }

    pub(crate) fn set_neighbors(&self, peers: Vec<PeerId>) {
        *self.neighbors.write() = peers;
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Uniform amount in the accepted range.
pub fn random_amount<R: Rng>(rng: &mut R) -> u32 {
    rng.gen_range(MIN_AMOUNT..=MAX_AMOUNT)
}

/// One transaction-gossip tick.
///
/// Returns the transaction it generated, or `None` if there were no
/// neighbors. The intent is logged even when the send fails.
pub fn transaction_tick<T, R>(
    state: &NodeState,
    transport: &T,
    keypair: &NodeKeypair,
    rng: &mut R,
) -> Option<Transaction>
where
    T: Transport + ?Sized,
    R: Rng,
{
    let peers = transport.peers();
    state.set_neighbors(peers.clone());

    let Some(receiver) = peers.choose(rng).copied() else {
        bump(&state.stats.idle_ticks);
        trace!("no neighbors, skipping transaction tick");
        return None;
    };

    let amount = random_amount(rng);
    let tx = sign_transaction(keypair, receiver, amount, current_timestamp());

    match transport.send(&receiver, &WireMessage::new(tx.clone())) {
        Ok(()) => {
            bump(&state.stats.transactions_sent);
            debug!(receiver = %receiver.short(), amount, "transaction sent");
        }
        Err(e) => {
            bump(&state.stats.send_failures);
            warn!(receiver = %receiver.short(), error = %e, "transaction send failed");
        }
    }

    state.transactions.record(&tx);
    Some(tx)
}

/// One topology-gossip tick. Sends the neighbor list to every neighbor and
/// returns how many sends succeeded.
pub fn topology_tick<T>(state: &NodeState, transport: &T) -> usize
where
    T: Transport + ?Sized,
{
    let peers = transport.peers();
    state.set_neighbors(peers.clone());
    if peers.is_empty() {
        bump(&state.stats.idle_ticks);
        trace!("no neighbors, skipping topology tick");
        return 0;
    }

    let message = WireMessage::new(PeerListAnnouncement::new(state.local_id, &peers));
    let mut delivered = 0;
    for peer in &peers {
        match transport.send(peer, &message) {
            Ok(()) => {
                bump(&state.stats.announcements_sent);
                delivered += 1;
            }
            Err(e) => {
                bump(&state.stats.send_failures);
                warn!(peer = %peer.short(), error = %e, "announcement send failed");
            }
        }
    }
    trace!(neighbors = peers.len(), delivered, "peer list announced");
    delivered
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Verify a received transaction and log it if it checks out.
pub fn handle_transaction(
    state: &NodeState,
    from: &PeerId,
    tx: &Transaction,
    require_sender_binding: bool,
) -> Result<TransactionLogEntry, TransactionError> {
    if let Err(e) = verify_transaction(tx, require_sender_binding) {
        bump(&state.stats.transactions_rejected);
        warn!(
            from = %from.short(),
            sender = %tx.sender().short(),
            error = %e,
            "rejected transaction"
        );
        return Err(e);
    }

    let entry = state.transactions.record(tx);
    bump(&state.stats.transactions_accepted);
    info!(
        sender = %entry.sender,
        receiver = %entry.receiver,
        amount = entry.amount,
        "accepted transaction"
    );
    Ok(entry)
}

/// Merge a received peer-list announcement into the local topology.
pub fn handle_peer_list(
    state: &NodeState,
    from: &PeerId,
    announcement: &PeerListAnnouncement,
) -> Result<MergeOutcome, MessageError> {
    let peers = match announcement.peers() {
        Ok(peers) => peers,
        Err(e) => {
            bump(&state.stats.announcements_rejected);
            warn!(from = %from.short(), error = %e, "rejected peer list");
            return Err(e);
        }
    };

    if announcement.node_id != *from {
        debug!(
            from = %from.short(),
            announced = %announcement.node_id.short(),
            "announcement relayed by a different peer"
        );
    }

    let outcome = state
        .topology
        .merge_announcement(&announcement.node_id, &peers, Utc::now());
    bump(&state.stats.announcements_merged);
    if outcome.new_nodes > 0 || outcome.new_edges > 0 {
        debug!(
            sender = %announcement.node_id.short(),
            new_nodes = outcome.new_nodes,
            new_edges = outcome.new_edges,
            "topology grew"
        );
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::local::LocalNetwork;
    use crate::network::message::Payload;
    use crate::network::transport::{InboundEvents, TransportEvent};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn peer_of(kp: &NodeKeypair) -> PeerId {
        PeerId::from_public_key(&kp.public_key())
    }

    fn next_payload(rx: &mut InboundEvents) -> Option<Payload> {
        while let Ok(event) = rx.try_recv() {
            if let TransportEvent::Message { frame, .. } = event {
                return Some(WireMessage::decode(&frame).unwrap().payload);
            }
        }
        None
    }

    #[test]
    fn random_amount_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let amount = random_amount(&mut rng);
            assert!((MIN_AMOUNT..=MAX_AMOUNT).contains(&amount));
        }
    }

    #[test]
    fn transaction_tick_without_neighbors_is_noop() {
        let kp = NodeKeypair::generate();
        let net = LocalNetwork::new();
        let (transport, _rx) = net.register(peer_of(&kp));
        let state = NodeState::new(peer_of(&kp), 100);

        let sent = transaction_tick(&state, &transport, &kp, &mut StdRng::seed_from_u64(1));
        assert!(sent.is_none());
        assert!(state.log().is_empty());
        assert_eq!(state.stats().snapshot().idle_ticks, 1);
    }

    #[test]
    fn transaction_tick_sends_and_logs() {
        let kp_a = NodeKeypair::generate();
        let kp_b = NodeKeypair::generate();
        let (a, b) = (peer_of(&kp_a), peer_of(&kp_b));
        let net = LocalNetwork::new();
        let (transport, _rx_a) = net.register(a);
        let (_tb, mut rx_b) = net.register(b);
        net.connect(&a, &b).unwrap();

        let state = NodeState::new(a, 100);
        let tx = transaction_tick(&state, &transport, &kp_a, &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert_eq!(tx.receiver(), &b);
        assert_eq!(state.recent_transactions(10).len(), 1);
        assert_eq!(state.stats().snapshot().transactions_sent, 1);
        assert_eq!(state.neighbors(), vec![b]);
        assert_eq!(next_payload(&mut rx_b), Some(Payload::Transaction(tx)));
    }

    #[test]
    fn transaction_tick_logs_intent_even_if_send_fails() {
        let kp_a = NodeKeypair::generate();
        let a = peer_of(&kp_a);
        let b = PeerId::from_bytes([2; 32]);
        let net = LocalNetwork::new();
        let (transport, _rx_a) = net.register(a);
        let (_tb, rx_b) = net.register(b);
        net.connect(&a, &b).unwrap();
        drop(rx_b);

        let state = NodeState::new(a, 100);
        assert!(transaction_tick(&state, &transport, &kp_a, &mut StdRng::seed_from_u64(3)).is_some());
        let stats = state.stats().snapshot();
        assert_eq!(stats.send_failures, 1);
        assert_eq!(stats.transactions_sent, 0);
        assert_eq!(state.log().len(), 1);
    }

    #[test]
    fn topology_tick_announces_to_every_neighbor() {
        let a = PeerId::from_bytes([1; 32]);
        let others = [PeerId::from_bytes([2; 32]), PeerId::from_bytes([3; 32])];
        let net = LocalNetwork::new();
        let (transport, _rx_a) = net.register(a);
        let mut receivers: Vec<_> = others.iter().map(|p| net.register(*p).1).collect();
        for p in &others {
            net.connect(&a, p).unwrap();
        }

        let state = NodeState::new(a, 10);
        assert_eq!(topology_tick(&state, &transport), 2);

        for rx in &mut receivers {
            match next_payload(rx) {
                Some(Payload::PeerList(ann)) => {
                    assert_eq!(ann.node_id, a);
                    assert_eq!(ann.peers().unwrap(), others.to_vec());
                }
                other => panic!("expected PeerList, got {:?}", other),
            }
        }
    }

    #[test]
    fn topology_tick_continues_after_one_failure() {
        let a = PeerId::from_bytes([1; 32]);
        let b = PeerId::from_bytes([2; 32]);
        let c = PeerId::from_bytes([3; 32]);
        let net = LocalNetwork::new();
        let (transport, _rx_a) = net.register(a);
        let (_tb, rx_b) = net.register(b);
        let (_tc, mut rx_c) = net.register(c);
        net.connect_all(&[a, b, c]).unwrap();
        drop(rx_b);

        let state = NodeState::new(a, 10);
        assert_eq!(topology_tick(&state, &transport), 1);
        assert_eq!(state.stats().snapshot().send_failures, 1);
        assert!(matches!(next_payload(&mut rx_c), Some(Payload::PeerList(_))));
    }

    #[test]
    fn handle_transaction_logs_valid_and_drops_invalid() {
        let kp = NodeKeypair::generate();
        let receiver = PeerId::from_bytes([5; 32]);
        let state = NodeState::new(receiver, 10);
        let from = peer_of(&kp);

        let tx = sign_transaction(&kp, receiver, 12, 100.0);
        let entry = handle_transaction(&state, &from, &tx, true).unwrap();
        assert_eq!(entry.sender, from.short());
        assert_eq!(entry.receiver, receiver.short());

        let forged = Transaction::from_parts(
            *tx.sender(),
            *tx.receiver(),
            13,
            tx.timestamp(),
            tx.signature().to_vec(),
            tx.public_key().to_vec(),
        );
        assert!(handle_transaction(&state, &from, &forged, true).is_err());

        assert_eq!(state.log().len(), 1);
        let stats = state.stats().snapshot();
        assert_eq!(stats.transactions_accepted, 1);
        assert_eq!(stats.transactions_rejected, 1);
    }

    #[test]
    fn handle_peer_list_merges_and_rejects_garbage() {
        let local = PeerId::from_bytes([1; 32]);
        let sender = PeerId::from_bytes([2; 32]);
        let state = NodeState::new(local, 10);

        let ann = PeerListAnnouncement::new(sender, &[local]);
        let outcome = handle_peer_list(&state, &sender, &ann).unwrap();
        assert_eq!(outcome.new_edges, 1);
        assert_eq!(state.topology().nodes.len(), 2);

        let bad = PeerListAnnouncement {
            node_id: sender,
            connected_peers: "zz".into(),
        };
        assert!(handle_peer_list(&state, &sender, &bad).is_err());
        assert_eq!(state.topology().edges.len(), 1);
        assert_eq!(state.stats().snapshot().announcements_rejected, 1);
    }
}
