//! Transaction construction and signing.
//!
//! The sender id is always derived from the signing keypair, so a node can
//! only ever produce transactions in its own name.

use chrono::Utc;

use super::types::{canonical_message, Transaction};
use crate::crypto::keys::NodeKeypair;
use crate::crypto::signatures::sign;
use crate::identity::PeerId;

/// Build and sign a transaction from this node to `receiver`.
///
/// # Example
///
/// ```
/// use gossipnet_protocol::crypto::NodeKeypair;
/// use gossipnet_protocol::identity::PeerId;
/// use gossipnet_protocol::transaction::{sign_transaction, verify_transaction};
///
/// let alice = NodeKeypair::generate();
/// let bob = PeerId::from_public_key(&NodeKeypair::generate().public_key());
/// let tx = sign_transaction(&alice, bob, 42, 1_700_000_000.5);
/// assert!(verify_transaction(&tx, true).is_ok());
/// ```
pub fn sign_transaction(
    keypair: &NodeKeypair,
    receiver: PeerId,
    amount: u32,
    timestamp: f64,
) -> Transaction {
    let public_key = keypair.public_key();
    let sender = PeerId::from_public_key(&public_key);
    let message = canonical_message(&sender, &receiver, amount, timestamp);
    let signature = sign(keypair, &message);

    Transaction::from_parts(
        sender,
        receiver,
        amount,
        timestamp,
        signature,
        public_key.as_bytes().to_vec(),
    )
}

/// Current wall-clock time as fractional unix seconds (microsecond
/// resolution).
pub fn current_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
