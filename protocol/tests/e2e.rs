//! End-to-end integration tests for gossipnet.
//!
//! These tests wire several nodes together over the in-process transport
//! and drive them tick by tick, the way a real deployment would, only
//! deterministically. Frames are encoded and decoded on every hop, so the
//! wire codec is exercised along with the gossip logic.
//!
//! Each test builds its own network. No shared state between tests.

use std::time::Duration;

use tokio::sync::watch;

use gossipnet_protocol::config::GossipConfig;
use gossipnet_protocol::crypto::keys::NodeKeypair;
use gossipnet_protocol::crypto::signatures::sign;
use gossipnet_protocol::identity::PeerId;
use gossipnet_protocol::network::{
    GossipNode, InboundEvents, LocalNetwork, LocalTransport, StopReason, Transport, WireMessage,
};
use gossipnet_protocol::transaction::{
    canonical_message, sign_transaction, verify_transaction, Transaction, TransactionError,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

struct TestNode {
    node: GossipNode<LocalTransport>,
    inbound: InboundEvents,
}

impl TestNode {
    fn id(&self) -> PeerId {
        *self.node.local_id()
    }

    /// Handle everything waiting in the inbox.
    fn pump(&mut self) {
        while let Ok(event) = self.inbound.try_recv() {
            self.node.handle_event(event);
        }
    }
}

fn spawn_nodes(net: &LocalNetwork, count: usize) -> Vec<TestNode> {
    (0..count)
        .map(|_| {
            let keypair = NodeKeypair::generate();
            let (transport, inbound) =
                net.register(PeerId::from_public_key(&keypair.public_key()));
            let node = GossipNode::new(keypair, transport, GossipConfig::default()).unwrap();
            TestNode { node, inbound }
        })
        .collect()
}

fn full_mesh(count: usize) -> (LocalNetwork, Vec<TestNode>) {
    let net = LocalNetwork::new();
    let nodes = spawn_nodes(&net, count);
    let ids: Vec<PeerId> = nodes.iter().map(TestNode::id).collect();
    net.connect_all(&ids).unwrap();
    (net, nodes)
}

fn pump_all(nodes: &mut [TestNode]) {
    for node in nodes.iter_mut() {
        node.pump();
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[test]
fn transaction_logged_by_sender_and_receiver() {
    let (_net, mut nodes) = full_mesh(3);
    pump_all(&mut nodes);

    let tx = nodes[0].node.transaction_tick().unwrap();
    pump_all(&mut nodes);

    let a = nodes[0].id();
    let receiver = *tx.receiver();
    assert_ne!(receiver, a);

    for node in &nodes {
        let log = node.node.state().recent_transactions(10);
        if node.id() == a || node.id() == receiver {
            assert_eq!(log.len(), 1, "node {} should log the transaction", node.id().short());
            assert_eq!(log[0].sender, a.short());
            assert_eq!(log[0].receiver, receiver.short());
            assert_eq!(log[0].amount, tx.amount());
        } else {
            assert!(log.is_empty(), "bystander must not see the transaction");
        }
    }
}

#[test]
fn generated_amounts_stay_in_range() {
    let (_net, mut nodes) = full_mesh(2);
    for _ in 0..200 {
        let tx = nodes[0].node.transaction_tick().unwrap();
        assert!((1..=100).contains(&tx.amount()));
    }
    pump_all(&mut nodes);
    let stats = nodes[1].node.state().stats().snapshot();
    assert_eq!(stats.transactions_accepted, 200);
    assert_eq!(stats.transactions_rejected, 0);
}

#[test]
fn isolated_node_skips_transaction_tick() {
    let net = LocalNetwork::new();
    let mut nodes = spawn_nodes(&net, 1);
    assert!(nodes[0].node.transaction_tick().is_none());
    assert!(nodes[0].node.state().log().is_empty());
}

#[test]
fn received_transactions_are_not_forwarded() {
    // Line: A - B - C
    let net = LocalNetwork::new();
    let mut nodes = spawn_nodes(&net, 3);
    let (a, b, c) = (nodes[0].id(), nodes[1].id(), nodes[2].id());
    net.connect(&a, &b).unwrap();
    net.connect(&b, &c).unwrap();

    nodes[0].node.transaction_tick().unwrap();
    for _ in 0..3 {
        pump_all(&mut nodes);
    }

    assert_eq!(nodes[1].node.state().log().len(), 1);
    assert!(nodes[2].node.state().log().is_empty());
}

#[test]
fn tampered_transaction_is_not_logged() {
    let (net, mut nodes) = full_mesh(2);
    let b = nodes[1].id();
    pump_all(&mut nodes);

    // Sender id and attached key agree, so only the signature can fail.
    let honest = NodeKeypair::generate();
    let impostor = NodeKeypair::generate();
    let honest_id = PeerId::from_public_key(&honest.public_key());
    let message = canonical_message(&honest_id, &b, 10, 1_700_000_000.0);
    let forged = Transaction::from_parts(
        honest_id,
        b,
        10,
        1_700_000_000.0,
        sign(&impostor, &message),
        honest.public_key().as_bytes().to_vec(),
    );
    assert_eq!(
        verify_transaction(&forged, true),
        Err(TransactionError::InvalidSignature {
            sender: honest_id.short()
        })
    );

    let (outsider, _rx) = net.register(honest_id);
    net.connect(&outsider.local_id(), &b).unwrap();
    outsider.send(&b, &WireMessage::new(forged)).unwrap();
    pump_all(&mut nodes);

    assert!(nodes[1].node.state().log().is_empty());
    assert_eq!(nodes[1].node.state().stats().snapshot().transactions_rejected, 1);
}

#[test]
fn key_substitution_rejected_when_binding_enforced() {
    let (net, mut nodes) = full_mesh(2);
    let (a, b) = (nodes[0].id(), nodes[1].id());
    pump_all(&mut nodes);

    // Mallory signs correctly with her own key but claims to be A.
    let mallory = NodeKeypair::generate();
    let message = canonical_message(&a, &b, 10, 5.0);
    let forged = Transaction::from_parts(
        a,
        b,
        10,
        5.0,
        sign(&mallory, &message),
        mallory.public_key().as_bytes().to_vec(),
    );

    let mallory_id = PeerId::from_public_key(&mallory.public_key());
    let (transport, _rx) = net.register(mallory_id);
    net.connect(&mallory_id, &b).unwrap();
    transport.send(&b, &WireMessage::new(forged)).unwrap();
    pump_all(&mut nodes);

    assert!(nodes[1].node.state().log().is_empty());

    // A genuine transaction from Mallory herself is fine.
    let genuine = sign_transaction(&mallory, b, 10, 6.0);
    transport.send(&b, &WireMessage::new(genuine)).unwrap();
    pump_all(&mut nodes);
    assert_eq!(nodes[1].node.state().log().len(), 1);
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

#[test]
fn fresh_node_has_exactly_one_topology_node() {
    let (_net, mut nodes) = full_mesh(3);
    pump_all(&mut nodes);
    for node in &nodes {
        let topo = node.node.state().topology();
        assert_eq!(topo.nodes.len(), 1);
        assert_eq!(topo.nodes[0].id, node.id());
        assert!(topo.edges.is_empty());
    }
}

#[test]
fn triangle_converges_regardless_of_tick_order() {
    let orders: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in orders {
        for pump_between in [false, true] {
            let (_net, mut nodes) = full_mesh(3);
            pump_all(&mut nodes);

            for &i in &order {
                nodes[i].node.topology_tick();
                if pump_between {
                    pump_all(&mut nodes);
                }
            }
            pump_all(&mut nodes);

            let ids: Vec<PeerId> = nodes.iter().map(TestNode::id).collect();
            for node in &nodes {
                let topo = node.node.state().topology();
                assert_eq!(topo.nodes.len(), 3, "order {:?}", order);
                assert_eq!(topo.edges.len(), 3, "order {:?}", order);
                assert!(topo.has_edge(&ids[0], &ids[1]));
                assert!(topo.has_edge(&ids[1], &ids[2]));
                assert!(topo.has_edge(&ids[0], &ids[2]));
            }
        }
    }
}

#[test]
fn repeated_announcements_do_not_duplicate_edges() {
    let (_net, mut nodes) = full_mesh(3);
    pump_all(&mut nodes);

    for _ in 0..5 {
        for node in &nodes {
            node.node.topology_tick();
        }
        pump_all(&mut nodes);
    }

    for node in &nodes {
        assert_eq!(node.node.state().topology().edges.len(), 3);
    }
}

#[test]
fn line_topology_learns_remote_nodes() {
    // A - B - C: A never talks to C but learns about it from B.
    let net = LocalNetwork::new();
    let mut nodes = spawn_nodes(&net, 3);
    let (a, b, c) = (nodes[0].id(), nodes[1].id(), nodes[2].id());
    net.connect(&a, &b).unwrap();
    net.connect(&b, &c).unwrap();
    pump_all(&mut nodes);

    for node in &nodes {
        node.node.topology_tick();
    }
    pump_all(&mut nodes);

    for node in &nodes {
        let topo = node.node.state().topology();
        assert_eq!(topo.nodes.len(), 3);
        assert_eq!(topo.edges.len(), 2);
        assert!(!topo.has_edge(&a, &c));
    }
    let view_from_a = nodes[0].node.state().topology();
    assert!(view_from_a.node(&c).is_some());
}

#[test]
fn disconnect_is_not_reflected_in_topology() {
    let (net, mut nodes) = full_mesh(2);
    let (a, b) = (nodes[0].id(), nodes[1].id());
    pump_all(&mut nodes);
    nodes[0].node.topology_tick();
    pump_all(&mut nodes);
    assert_eq!(nodes[1].node.state().topology().edges.len(), 1);

    net.disconnect(&a, &b);
    pump_all(&mut nodes);

    assert!(nodes[1].node.state().neighbors().is_empty());
    assert_eq!(nodes[1].node.state().topology().edges.len(), 1);
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn timed_run_converges_and_shuts_down() {
    let net = LocalNetwork::new();
    let config = GossipConfig {
        runtime: Some(Duration::from_secs(6)),
        ..GossipConfig::default()
    };

    let mut runners = Vec::new();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let keypair = NodeKeypair::generate();
        let id = PeerId::from_public_key(&keypair.public_key());
        let (transport, inbound) = net.register(id);
        runners.push((GossipNode::new(keypair, transport, config.clone()).unwrap(), inbound));
        ids.push(id);
    }
    net.connect_all(&ids).unwrap();

    let (_shutdown_tx, shutdown) = watch::channel(false);
    let mut states = Vec::new();
    let mut handles = Vec::new();
    for (node, inbound) in runners {
        states.push(node.state());
        handles.push(tokio::spawn(node.run(inbound, shutdown.clone())));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StopReason::RuntimeElapsed);
    }

    // Transaction ticks at 0s and 5s; every transaction is logged twice.
    let total_logged: usize = states.iter().map(|s| s.log().len()).sum();
    assert_eq!(total_logged, 12);

    for state in &states {
        let topo = state.topology();
        assert_eq!(topo.nodes.len(), 3);
        assert_eq!(topo.edges.len(), 3);
        assert_eq!(state.stats().snapshot().transactions_sent, 2);
    }
    assert_eq!(net.peer_count(), 0);
}
