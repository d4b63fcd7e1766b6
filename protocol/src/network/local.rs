//! # In-Process Transport
//!
//! [`LocalNetwork`] is a hub that wires any number of nodes together inside
//! one process. Each registered peer gets a mailbox (an unbounded tokio
//! channel) and a [`LocalTransport`] handle. Links are explicit and
//! undirected; a frame can only travel over an existing link.
//!
//! Frames are encoded on send and decoded by the receiver, exactly as they
//! would be over a socket, so codec bugs show up here too.
//!
//! ```text
//! node A --send--> LocalTransport(A) --encode--> hub --mailbox(B)--> node B
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::message::WireMessage;
use super::transport::{InboundEvents, Transport, TransportError, TransportEvent};
use crate::crypto::hash::fingerprint;
use crate::identity::PeerId;
use crate::topology::ConnectionKey;

#[derive(Debug, Default)]
struct HubInner {
    mailboxes: HashMap<PeerId, mpsc::UnboundedSender<TransportEvent>>,
    links: HashSet<ConnectionKey>,
}

impl HubInner {
    fn notify(&self, to: &PeerId, event: TransportEvent) {
        if let Some(mailbox) = self.mailboxes.get(to) {
            // A closed mailbox just means the node already stopped.
            let _ = mailbox.send(event);
        }
    }

    fn neighbors(&self, id: &PeerId) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self
            .links
            .iter()
            .filter(|key| key.contains(id))
            .map(|key| if key.low() == id { *key.high() } else { *key.low() })
            .collect();
        peers.sort();
        peers
    }
}

/// Shared in-memory network. Cloning gives another handle to the same hub.
#[derive(Debug, Clone, Default)]
pub struct LocalNetwork {
    inner: Arc<RwLock<HubInner>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer and return its transport and inbound event stream.
    ///
    /// Registering an id again replaces its mailbox; the old receiver stops
    /// getting events.
    pub fn register(&self, id: PeerId) -> (LocalTransport, InboundEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().mailboxes.insert(id, tx);
        debug!(peer = %id.short(), "registered on local network");
        (
            LocalTransport {
                id,
                network: self.clone(),
            },
            rx,
        )
    }

    /// Remove a peer and all its links. Former neighbors get `PeerLeft`.
    pub fn unregister(&self, id: &PeerId) {
        let mut inner = self.inner.write();
        let neighbors = inner.neighbors(id);
        inner.links.retain(|key| !key.contains(id));
        inner.mailboxes.remove(id);
        for peer in &neighbors {
            inner.notify(peer, TransportEvent::PeerLeft(*id));
        }
        debug!(peer = %id.short(), "left local network");
    }

    /// Link two registered peers. Both sides get `PeerJoined`. Linking an
    /// already-linked pair does nothing.
    pub fn connect(&self, a: &PeerId, b: &PeerId) -> Result<(), TransportError> {
        if a == b {
            return Err(TransportError::NotConnected(a.short()));
        }
        let mut inner = self.inner.write();
        for id in [a, b] {
            if !inner.mailboxes.contains_key(id) {
                return Err(TransportError::UnknownPeer(id.short()));
            }
        }
        if inner.links.insert(ConnectionKey::new(*a, *b)) {
            inner.notify(a, TransportEvent::PeerJoined(*b));
            inner.notify(b, TransportEvent::PeerJoined(*a));
        }
        Ok(())
    }

    /// Link every pair in `ids`.
    pub fn connect_all(&self, ids: &[PeerId]) -> Result<(), TransportError> {
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                self.connect(a, b)?;
            }
        }
        Ok(())
    }

    /// Remove a link. Returns whether one existed.
    pub fn disconnect(&self, a: &PeerId, b: &PeerId) -> bool {
        let mut inner = self.inner.write();
        let removed = inner.links.remove(&ConnectionKey::new(*a, *b));
        if removed {
            inner.notify(a, TransportEvent::PeerLeft(*b));
            inner.notify(b, TransportEvent::PeerLeft(*a));
        }
        removed
    }

    pub fn neighbors(&self, id: &PeerId) -> Vec<PeerId> {
        self.inner.read().neighbors(id)
    }

    pub fn is_connected(&self, a: &PeerId, b: &PeerId) -> bool {
        self.inner.read().links.contains(&ConnectionKey::new(*a, *b))
    }

    pub fn peer_count(&self) -> usize {
        self.inner.read().mailboxes.len()
    }

    fn deliver(&self, from: &PeerId, to: &PeerId, message: &WireMessage) -> Result<(), TransportError> {
        let frame = message.encode()?;
        let inner = self.inner.read();
        let mailbox = inner
            .mailboxes
            .get(to)
            .ok_or_else(|| TransportError::UnknownPeer(to.short()))?;
        if !inner.links.contains(&ConnectionKey::new(*from, *to)) {
            return Err(TransportError::NotConnected(to.short()));
        }
        trace!(
            from = %from.short(),
            to = %to.short(),
            bytes = frame.len(),
            frame = %fingerprint(&frame),
            "frame queued"
        );
        mailbox
            .send(TransportEvent::Message { from: *from, frame })
            .map_err(|_| TransportError::Closed(to.short()))
    }
}

/// One peer's handle onto a [`LocalNetwork`].
#[derive(Debug, Clone)]
pub struct LocalTransport {
    id: PeerId,
    network: LocalNetwork,
}

impl Transport for LocalTransport {
    fn local_id(&self) -> PeerId {
        self.id
    }

    fn peers(&self) -> Vec<PeerId> {
        self.network.neighbors(&self.id)
    }

    fn send(&self, to: &PeerId, message: &WireMessage) -> Result<(), TransportError> {
        self.network.deliver(&self.id, to, message)
    }

    fn close(&self) {
        self.network.unregister(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::message::{Payload, PeerListAnnouncement};

    fn id(b: u8) -> PeerId {
        PeerId::from_bytes([b; 32])
    }

    fn drain(rx: &mut InboundEvents) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[test]
    fn connect_notifies_both_sides_once() {
        let net = LocalNetwork::new();
        let (_a, mut rx_a) = net.register(id(1));
        let (_b, mut rx_b) = net.register(id(2));

        net.connect(&id(1), &id(2)).unwrap();
        net.connect(&id(2), &id(1)).unwrap();

        assert_eq!(drain(&mut rx_a), vec![TransportEvent::PeerJoined(id(2))]);
        assert_eq!(drain(&mut rx_b), vec![TransportEvent::PeerJoined(id(1))]);
        assert!(net.is_connected(&id(2), &id(1)));
    }

    #[test]
    fn connect_rejects_unknown_and_self() {
        let net = LocalNetwork::new();
        let _ = net.register(id(1));
        assert!(matches!(
            net.connect(&id(1), &id(9)),
            Err(TransportError::UnknownPeer(_))
        ));
        assert!(net.connect(&id(1), &id(1)).is_err());
    }

    #[test]
    fn peers_reflect_links() {
        let net = LocalNetwork::new();
        let (a, _rx_a) = net.register(id(1));
        let _b = net.register(id(2));
        let _c = net.register(id(3));
        assert!(a.peers().is_empty());

        net.connect_all(&[id(1), id(2), id(3)]).unwrap();
        assert_eq!(a.peers(), vec![id(2), id(3)]);

        assert!(net.disconnect(&id(1), &id(3)));
        assert!(!net.disconnect(&id(1), &id(3)));
        assert_eq!(a.peers(), vec![id(2)]);
    }

    #[test]
    fn send_delivers_encoded_frame() {
        let net = LocalNetwork::new();
        let (a, _rx_a) = net.register(id(1));
        let (_b, mut rx_b) = net.register(id(2));
        net.connect(&id(1), &id(2)).unwrap();
        drain(&mut rx_b);

        let msg = WireMessage::new(PeerListAnnouncement::new(id(1), &[id(2)]));
        a.send(&id(2), &msg).unwrap();

        match rx_b.try_recv().unwrap() {
            TransportEvent::Message { from, frame } => {
                assert_eq!(from, id(1));
                // The receiver sees the same bytes the sender's trace line
                // fingerprinted.
                assert_eq!(fingerprint(&frame), fingerprint(&msg.encode().unwrap()));
                let decoded = WireMessage::decode(&frame).unwrap();
                assert!(matches!(decoded.payload, Payload::PeerList(_)));
            }
            other => panic!("expected Message, got {:?}", other),
        }
    }

    #[test]
    fn send_requires_link() {
        let net = LocalNetwork::new();
        let (a, _rx_a) = net.register(id(1));
        let _b = net.register(id(2));
        let msg = WireMessage::new(PeerListAnnouncement::new(id(1), &[]));

        assert!(matches!(
            a.send(&id(2), &msg),
            Err(TransportError::NotConnected(_))
        ));
        assert!(matches!(
            a.send(&id(3), &msg),
            Err(TransportError::UnknownPeer(_))
        ));
    }

    #[test]
    fn send_to_dropped_receiver_is_closed() {
        let net = LocalNetwork::new();
        let (a, _rx_a) = net.register(id(1));
        let (_b, rx_b) = net.register(id(2));
        net.connect(&id(1), &id(2)).unwrap();
        drop(rx_b);

        let msg = WireMessage::new(PeerListAnnouncement::new(id(1), &[]));
        assert!(matches!(a.send(&id(2), &msg), Err(TransportError::Closed(_))));
    }

    #[test]
    fn close_unregisters_and_notifies_neighbors() {
        let net = LocalNetwork::new();
        let (a, _rx_a) = net.register(id(1));
        let (_b, mut rx_b) = net.register(id(2));
        net.connect(&id(1), &id(2)).unwrap();
        drain(&mut rx_b);

        a.close();
        assert_eq!(net.peer_count(), 1);
        assert!(net.neighbors(&id(2)).is_empty());
        assert_eq!(drain(&mut rx_b), vec![TransportEvent::PeerLeft(id(1))]);
    }
}
