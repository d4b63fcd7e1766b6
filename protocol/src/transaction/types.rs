//! Core transaction record and its canonical signing bytes.
//!
//! A [`Transaction`] is a signed statement of intent: "sender moves
//! `amount` to receiver at `timestamp`". It is not a ledger entry. Nobody
//! checks balances and nothing prevents double spends; the only guarantee
//! is that the holder of the attached key signed exactly these fields.
//!
//! The field order below is part of the wire contract. Reordering fields
//! breaks interoperability with every existing node.

use serde::{Deserialize, Serialize};

use crate::identity::PeerId;

/// A signed value-transfer record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    sender: PeerId,
    receiver: PeerId,
    amount: u32,
    /// Unix seconds with sub-second precision.
    timestamp: f64,
    signature: Vec<u8>,
    public_key: Vec<u8>,
}

impl Transaction {
    /// Assemble a transaction from already-computed parts.
    ///
    /// Nothing is checked here. Use [`crate::transaction::sign_transaction`]
    /// to build a valid one and [`crate::transaction::verify_transaction`]
    /// to check one received from a peer.
    pub fn from_parts(
        sender: PeerId,
        receiver: PeerId,
        amount: u32,
        timestamp: f64,
        signature: Vec<u8>,
        public_key: Vec<u8>,
    ) -> Self {
        Self {
            sender,
            receiver,
            amount,
            timestamp,
            signature,
            public_key,
        }
    }

    pub fn sender(&self) -> &PeerId {
        &self.sender
    }

    pub fn receiver(&self) -> &PeerId {
        &self.receiver
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The bytes the signature covers, rebuilt from this record's fields.
    pub fn signable_bytes(&self) -> Vec<u8> {
        canonical_message(&self.sender, &self.receiver, self.amount, self.timestamp)
    }
}

/// Canonical signing message:
///
/// ```text
/// sender (32) || receiver (32) || amount (u32, big-endian) || decimal(timestamp)
/// ```
pub fn canonical_message(
    sender: &PeerId,
    receiver: &PeerId,
    amount: u32,
    timestamp: f64,
) -> Vec<u8> {
    let ts = canonical_timestamp(timestamp);
    let mut message = Vec::with_capacity(sender.as_bytes().len() * 2 + 4 + ts.len());
    message.extend_from_slice(sender.as_bytes());
    message.extend_from_slice(receiver.as_bytes());
    message.extend_from_slice(&amount.to_be_bytes());
    message.extend_from_slice(ts.as_bytes());
    message
}

/// Decimal rendering of a timestamp used inside the signing message.
///
/// Shortest representation that round-trips, always with a fractional
/// part: `1700000000.0`, `1700000000.25`. Non-finite values render as-is
/// and never verify since signers only produce finite timestamps.
pub fn canonical_timestamp(timestamp: f64) -> String {
    let mut rendered = timestamp.to_string();
    if timestamp.is_finite() && !rendered.contains('.') {
        rendered.push_str(".0");
    }
    rendered
}
