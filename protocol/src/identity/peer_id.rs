//! # Peer Identifiers
//!
//! A `PeerId` is the BLAKE3 digest of a node's Ed25519 verifying key:
//!
//! ```text
//! verifying_key (32 bytes) -> BLAKE3 -> PeerId (32 bytes) -> hex for display
//! ```
//!
//! Hashing instead of using the raw key gives a fixed-size identifier that
//! doesn't change shape if the key scheme ever does, and lets a receiver
//! check that the key attached to a transaction really belongs to the
//! claimed sender.
//!
//! `PeerId` orders by its bytes. Topology uses that order to build
//! direction-free connection keys.
//!
//! Human-readable formats (JSON) carry the full hex string; binary formats
//! (the bincode wire) carry the raw 32 bytes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{PEER_ID_LENGTH, PEER_PREFIX_LENGTH};
use crate::crypto::hash::blake3_hash;
use crate::crypto::keys::PublicKey;

/// Errors while parsing a peer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerIdError {
    #[error("peer id is not valid hex: {0}")]
    InvalidHex(String),

    #[error("peer id must be {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// Opaque fixed-length node identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId {
    bytes: [u8; PEER_ID_LENGTH],
}

impl PeerId {
    /// Derive the identifier owned by `public_key`.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self::from_public_key_bytes(public_key.as_bytes())
    }

    /// Derive an identifier from raw key bytes as they arrive on the wire.
    /// No curve validation happens here; this is a plain hash.
    pub fn from_public_key_bytes(public_key: &[u8]) -> Self {
        Self {
            bytes: blake3_hash(public_key),
        }
    }

    pub const fn from_bytes(bytes: [u8; PEER_ID_LENGTH]) -> Self {
        Self { bytes }
    }

    pub fn try_from_slice(slice: &[u8]) -> Result<Self, PeerIdError> {
        let bytes: [u8; PEER_ID_LENGTH] =
            slice.try_into().map_err(|_| PeerIdError::InvalidLength {
                expected: PEER_ID_LENGTH,
                got: slice.len(),
            })?;
        Ok(Self { bytes })
    }

    pub const fn as_bytes(&self) -> &[u8; PEER_ID_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, PeerIdError> {
        let bytes = hex::decode(s).map_err(|e| PeerIdError::InvalidHex(e.to_string()))?;
        Self::try_from_slice(&bytes)
    }

    /// Short human-readable label. Several peers may share one; it is only
    /// ever used for display.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(PEER_PREFIX_LENGTH);
        hex
    }

    /// Whether `public_key` hashes to this identifier.
    pub fn matches_public_key(&self, public_key: &[u8]) -> bool {
        Self::from_public_key_bytes(public_key) == *self
    }
}

impl FromStr for PeerId {
    type Err = PeerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

impl Serialize for PeerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.bytes.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <[u8; PEER_ID_LENGTH]>::deserialize(deserializer)?;
            Ok(Self { bytes })
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.short())
    }
}
