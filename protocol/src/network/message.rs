//! # Wire Messages
//!
//! Everything two nodes say to each other is a [`WireMessage`]: a small
//! envelope (community id, wire version) around a tagged [`Payload`].
//!
//! ```text
//! WireMessage { community_id: [u8; 20], version: u16, payload }
//! Payload     = Transaction(Transaction) | PeerList(PeerListAnnouncement)
//! ```
//!
//! Frames are bincode with fixed-width integers and a hard size cap, so a
//! hostile length prefix cannot make a node allocate more than
//! `MAX_FRAME_SIZE`. Field order inside each payload is part of the
//! compatibility contract.

use bincode::Options;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{COMMUNITY_ID, MAX_FRAME_SIZE, PEER_LIST_DELIMITER, WIRE_PROTOCOL_VERSION};
use crate::identity::{PeerId, PeerIdError};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("failed to encode frame: {0}")]
    Encode(String),

    #[error("failed to decode frame: {0}")]
    Decode(String),

    #[error("frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("unsupported wire version {got} (expected {expected})")]
    VersionMismatch { expected: u16, got: u16 },

    #[error("frame belongs to a different community")]
    ForeignCommunity,

    #[error("invalid peer list entry {entry:?}: {source}")]
    InvalidPeerList {
        entry: String,
        #[source]
        source: PeerIdError,
    },
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A node's list of its current direct neighbors.
///
/// `connected_peers` is a single delimited string of hex ids, kept as a
/// string on the wire so the record stays fixed-field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerListAnnouncement {
    pub node_id: PeerId,
    pub connected_peers: String,
}

impl PeerListAnnouncement {
    pub fn new(node_id: PeerId, peers: &[PeerId]) -> Self {
        let delimiter = PEER_LIST_DELIMITER.to_string();
        let connected_peers = peers
            .iter()
            .map(PeerId::to_hex)
            .collect::<Vec<_>>()
            .join(&delimiter);
        Self {
            node_id,
            connected_peers,
        }
    }

    /// Parse the announced neighbors. Empty segments are skipped, so an
    /// empty string is an empty list. Any malformed id rejects the whole
    /// announcement.
    pub fn peers(&self) -> Result<Vec<PeerId>, MessageError> {
        self.connected_peers
            .split(PEER_LIST_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                PeerId::from_hex(s).map_err(|source| MessageError::InvalidPeerList {
                    entry: s.to_string(),
                    source,
                })
            })
            .collect()
    }
}

/// Discriminant of [`Payload`], used as the dispatch table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Transaction,
    PeerList,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::PeerList => "peer_list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Transaction(Transaction),
    PeerList(PeerListAnnouncement),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Transaction(_) => PayloadKind::Transaction,
            Self::PeerList(_) => PayloadKind::PeerList,
        }
    }
}

impl From<Transaction> for Payload {
    fn from(tx: Transaction) -> Self {
        Self::Transaction(tx)
    }
}

impl From<PeerListAnnouncement> for Payload {
    fn from(announcement: PeerListAnnouncement) -> Self {
        Self::PeerList(announcement)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub community_id: [u8; 20],
    pub version: u16,
    pub payload: Payload,
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_FRAME_SIZE as u64)
}

impl WireMessage {
    /// Wrap a payload for this community at the current wire version.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            community_id: *COMMUNITY_ID,
            version: WIRE_PROTOCOL_VERSION,
            payload: payload.into(),
        }
    }

    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    pub fn encode(&self) -> Result<Bytes, MessageError> {
        let bytes = wire_options()
            .serialize(self)
            .map_err(|e| MessageError::Encode(e.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    /// Decode and validate a frame received from a peer.
    pub fn decode(frame: &[u8]) -> Result<Self, MessageError> {
        if frame.len() > MAX_FRAME_SIZE {
            return Err(MessageError::FrameTooLarge {
                size: frame.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        let message: Self = wire_options()
            .deserialize(frame)
            .map_err(|e| MessageError::Decode(e.to_string()))?;

        if message.community_id != *COMMUNITY_ID {
            return Err(MessageError::ForeignCommunity);
        }
        if message.version != WIRE_PROTOCOL_VERSION {
            return Err(MessageError::VersionMismatch {
                expected: WIRE_PROTOCOL_VERSION,
                got: message.version,
            });
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::NodeKeypair;
    use crate::transaction::sign_transaction;

    fn id(b: u8) -> PeerId {
        PeerId::from_bytes([b; 32])
    }

    #[test]
    fn announcement_joins_and_parses_peers() {
        let ann = PeerListAnnouncement::new(id(1), &[id(2), id(3)]);
        assert_eq!(ann.connected_peers.matches(',').count(), 1);
        assert_eq!(ann.peers().unwrap(), vec![id(2), id(3)]);
    }

    #[test]
    fn empty_announcement_has_no_peers() {
        let ann = PeerListAnnouncement::new(id(1), &[]);
        assert_eq!(ann.connected_peers, "");
        assert!(ann.peers().unwrap().is_empty());
    }

    #[test]
    fn announcement_tolerates_stray_delimiters() {
        let ann = PeerListAnnouncement {
            node_id: id(1),
            connected_peers: format!(",{}, ,", id(2).to_hex()),
        };
        assert_eq!(ann.peers().unwrap(), vec![id(2)]);
    }

    #[test]
    fn announcement_rejects_bad_entry() {
        let ann = PeerListAnnouncement {
            node_id: id(1),
            connected_peers: format!("{},nothex", id(2).to_hex()),
        };
        match ann.peers() {
            Err(MessageError::InvalidPeerList { entry, .. }) => assert_eq!(entry, "nothex"),
            other => panic!("expected InvalidPeerList, got {:?}", other),
        }
    }

    #[test]
    fn frame_roundtrip_preserves_payload() {
        let kp = NodeKeypair::generate();
        let tx = sign_transaction(&kp, id(7), 55, 1_700_000_000.125);
        let msg = WireMessage::new(tx.clone());
        assert_eq!(msg.kind(), PayloadKind::Transaction);

        let decoded = WireMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded.payload, Payload::Transaction(tx));
    }

    #[test]
    fn rejects_garbage_and_truncated_frames() {
        assert!(matches!(
            WireMessage::decode(b"not a frame"),
            Err(MessageError::Decode(_))
        ));

        let frame = WireMessage::new(PeerListAnnouncement::new(id(1), &[id(2)]))
            .encode()
            .unwrap();
        assert!(WireMessage::decode(&frame[..frame.len() - 5]).is_err());
    }

    #[test]
    fn rejects_oversized_frame() {
        let frame = vec![0u8; MAX_FRAME_SIZE + 1];
        assert!(matches!(
            WireMessage::decode(&frame),
            Err(MessageError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_foreign_community_and_version() {
        let mut msg = WireMessage::new(PeerListAnnouncement::new(id(1), &[]));
        msg.community_id = *b"someone-elses-net-01";
        assert_eq!(
            WireMessage::decode(&msg.encode().unwrap()),
            Err(MessageError::ForeignCommunity)
        );

        let mut msg = WireMessage::new(PeerListAnnouncement::new(id(1), &[]));
        msg.version = WIRE_PROTOCOL_VERSION + 1;
        assert!(matches!(
            WireMessage::decode(&msg.encode().unwrap()),
            Err(MessageError::VersionMismatch { .. })
        ));
    }
}
