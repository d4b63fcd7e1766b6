//! The transport contract the gossip node consumes.
//!
//! A transport knows who the direct neighbors are and can hand a frame to
//! one of them. That is all. It does not retry, acknowledge, or order
//! anything. Inbound traffic and membership changes arrive on a separate
//! channel of [`TransportEvent`]s, which the node drains from its loop.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use super::message::{MessageError, WireMessage};
use crate::identity::PeerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A raw frame from a neighbor. Decoding is the receiver's job.
    Message { from: PeerId, frame: Bytes },
    PeerJoined(PeerId),
    PeerLeft(PeerId),
}

pub type InboundEvents = mpsc::UnboundedReceiver<TransportEvent>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unknown peer {0}")]
    UnknownPeer(String),

    #[error("not connected to peer {0}")]
    NotConnected(String),

    #[error("peer {0} is no longer receiving")]
    Closed(String),

    #[error(transparent)]
    Message(#[from] MessageError),
}

/// Best-effort, one-way message transport.
pub trait Transport: Send + Sync + 'static {
    fn local_id(&self) -> PeerId;

    /// Current direct neighbors.
    fn peers(&self) -> Vec<PeerId>;

    /// Queue `message` for `to` and return immediately. `Ok` means the frame
    /// left this node, not that anyone received it.
    fn send(&self, to: &PeerId, message: &WireMessage) -> Result<(), TransportError>;

    /// Stop participating. Default is a no-op.
    fn close(&self) {}
}
