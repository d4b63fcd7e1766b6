//! # Gossip Node
//!
//! `GossipNode` is the per-peer runtime. It owns the keypair, the transport
//! handle, and the dispatch table, and shares a [`NodeState`] with whoever
//! wants to watch (the HTTP API, tests).
//!
//! ## The loop
//!
//! [`GossipNode::run`] is one cooperative loop:
//!
//! ```text
//! select! {
//!     transaction interval -> transaction_tick()
//!     topology interval    -> topology_tick()
//!     inbound event        -> handle_event()
//!     shutdown / runtime   -> close transport, return
//! }
//! ```
//!
//! Only one branch runs at a time, so ticks never overlap each other or an
//! inbound handler. A tick that overruns pushes the next one back instead
//! of bursting (`MissedTickBehavior::Delay`).
//!
//! ## Shutdown
//!
//! The loop watches a `tokio::sync::watch` channel. Sending `true` or
//! dropping the sender stops it. An optional `runtime` in [`GossipConfig`]
//! stops it as well. Either way the transport is closed before `run`
//! returns.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::dispatch::DispatchTable;
use super::gossip::{self, NodeState};
use super::message::{Payload, PayloadKind, WireMessage};
use super::transport::{InboundEvents, Transport, TransportEvent};
use crate::config::GossipConfig;
use crate::crypto::keys::NodeKeypair;
use crate::identity::PeerId;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("invalid gossip config: {0}")]
    InvalidConfig(String),

    #[error("transport identity {transport} does not match keypair identity {keypair}")]
    IdentityMismatch { keypair: String, transport: String },
}

/// Why [`GossipNode::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    RuntimeElapsed,
    /// The inbound channel closed under us.
    TransportClosed,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

pub struct GossipNode<T: Transport> {
    keypair: NodeKeypair,
    transport: T,
    config: GossipConfig,
    state: Arc<NodeState>,
    dispatch: DispatchTable,
    rng: StdRng,
}

impl<T: Transport> GossipNode<T> {
    pub fn new(keypair: NodeKeypair, transport: T, config: GossipConfig) -> Result<Self, NodeError> {
        Self::with_rng(keypair, transport, config, StdRng::from_entropy())
    }

    /// Like [`GossipNode::new`] with a caller-supplied RNG, for reproducible
    /// neighbor and amount choices.
    pub fn with_rng(
        keypair: NodeKeypair,
        transport: T,
        config: GossipConfig,
        rng: StdRng,
    ) -> Result<Self, NodeError> {
        if config.transaction_interval.is_zero() || config.topology_interval.is_zero() {
            return Err(NodeError::InvalidConfig(
                "gossip intervals must be non-zero".into(),
            ));
        }

        let local_id = PeerId::from_public_key(&keypair.public_key());
        if transport.local_id() != local_id {
            return Err(NodeError::IdentityMismatch {
                keypair: local_id.short(),
                transport: transport.local_id().short(),
            });
        }

        let state = Arc::new(NodeState::new(local_id, config.log_capacity));
        let dispatch = default_dispatch(&state, config.require_sender_binding);

        info!(peer = %local_id.short(), "gossip node created");

        Ok(Self {
            keypair,
            transport,
            config,
            state,
            dispatch,
            rng,
        })
    }

    pub fn local_id(&self) -> &PeerId {
        self.state.local_id()
    }

    /// Shared handle for observers.
    pub fn state(&self) -> Arc<NodeState> {
        Arc::clone(&self.state)
    }

    /// Run one transaction-gossip tick now.
    pub fn transaction_tick(&mut self) -> Option<Transaction> {
        gossip::transaction_tick(&self.state, &self.transport, &self.keypair, &mut self.rng)
    }

    /// Run one topology-gossip tick now.
    pub fn topology_tick(&self) -> usize {
        gossip::topology_tick(&self.state, &self.transport)
    }

    /// Process one transport event.
    pub fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Message { from, frame } => match WireMessage::decode(&frame) {
                Ok(message) => {
                    let kind = message.kind();
                    if !self.dispatch.dispatch(&from, message.payload) {
                        self.state.stats().record_unhandled_payload();
                        debug!(from = %from.short(), kind = kind.as_str(), "no handler for payload");
                    }
                }
                Err(e) => {
                    self.state.stats().record_malformed_frame();
                    warn!(from = %from.short(), error = %e, "dropping malformed frame");
                }
            },
            // Membership changes are logged only. Topology learns about
            // peers through gossip.
            TransportEvent::PeerJoined(peer) => {
                info!(peer = %peer.short(), "connected to peer");
                self.state.set_neighbors(self.transport.peers());
            }
            TransportEvent::PeerLeft(peer) => {
                info!(peer = %peer.short(), "peer disconnected");
                self.state.set_neighbors(self.transport.peers());
            }
        }
    }

    /// Drive the node until shutdown, runtime expiry, or transport close.
    pub async fn run(
        mut self,
        mut inbound: InboundEvents,
        mut shutdown: watch::Receiver<bool>,
    ) -> StopReason {
        let start = Instant::now();
        let mut tx_interval = interval_at(
            start + self.config.transaction_initial_delay,
            self.config.transaction_interval,
        );
        tx_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut topo_interval = interval_at(
            start + self.config.topology_initial_delay,
            self.config.topology_interval,
        );
        topo_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let deadline = self.config.runtime.map(|d| start + d);
        let runtime_elapsed = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(runtime_elapsed);

        info!(
            peer = %self.local_id().short(),
            tx_interval_ms = self.config.transaction_interval.as_millis() as u64,
            topology_interval_ms = self.config.topology_interval.as_millis() as u64,
            runtime_secs = self.config.runtime.map(|d| d.as_secs()),
            "gossip node starting"
        );

        let reason = loop {
            if *shutdown.borrow() {
                break StopReason::Shutdown;
            }

            tokio::select! {
                _ = tx_interval.tick() => {
                    self.transaction_tick();
                }
                _ = topo_interval.tick() => {
                    self.topology_tick();
                }
                event = inbound.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break StopReason::TransportClosed,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break StopReason::Shutdown;
                    }
                }
                _ = &mut runtime_elapsed => break StopReason::RuntimeElapsed,
            }
        };

        self.transport.close();
        let stats = self.state.stats().snapshot();
        info!(
            peer = %self.local_id().short(),
            reason = ?reason,
            sent = stats.transactions_sent,
            accepted = stats.transactions_accepted,
            rejected = stats.transactions_rejected,
            "gossip node stopped"
        );
        reason
    }
}

/// Handlers for both payload kinds, bound to `state`.
fn default_dispatch(state: &Arc<NodeState>, require_sender_binding: bool) -> DispatchTable {
    let mut table = DispatchTable::new();

    let tx_state = Arc::clone(state);
    table.register(PayloadKind::Transaction, move |from, payload| {
        if let Payload::Transaction(tx) = payload {
            // Rejections are logged and counted inside the handler.
            let _ = gossip::handle_transaction(&tx_state, from, &tx, require_sender_binding);
        }
    });

    let topo_state = Arc::clone(state);
    table.register(PayloadKind::PeerList, move |from, payload| {
        if let Payload::PeerList(announcement) = payload {
            let _ = gossip::handle_peer_list(&topo_state, from, &announcement);
        }
    });

    table
}
