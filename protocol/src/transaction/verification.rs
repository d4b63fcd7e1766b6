//! Transaction verification: structural checks and signature validation.
//!
//! Every transaction that arrives from a peer passes through
//! [`verify_transaction`] before it is logged. Checks run cheapest first, so
//! obviously broken records are dropped before any curve arithmetic.
//!
//! A transaction that fails here is dropped silently as far as the network
//! is concerned. The caller logs the reason and moves on.

use thiserror::Error;

use super::types::Transaction;
use crate::config::{MAX_AMOUNT, MIN_AMOUNT};
use crate::crypto::signatures::{verify_detailed, SignatureError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a transaction was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransactionError {
    /// Amount outside the accepted range.
    #[error("amount {amount} outside accepted range {min}..={max}")]
    AmountOutOfRange { amount: u32, min: u32, max: u32 },

    /// Timestamp is NaN or infinite.
    #[error("timestamp is not a finite number")]
    NonFiniteTimestamp,

    /// The signature is not 64 bytes.
    #[error("malformed signature: {reason}")]
    MalformedSignature { reason: String },

    /// The attached public key is not a valid Ed25519 point.
    #[error("malformed public key attached by sender {sender}")]
    MalformedPublicKey { sender: String },

    /// The attached public key does not hash to the claimed sender id.
    #[error("public key does not belong to sender {sender}")]
    SenderKeyMismatch { sender: String },

    /// The signature does not verify over the canonical message.
    #[error("invalid signature: does not verify against sender {sender}")]
    InvalidSignature { sender: String },
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify a received transaction.
///
/// The checks, in order:
///
/// 1. **Amount**: within `MIN_AMOUNT..=MAX_AMOUNT`.
/// 2. **Timestamp**: finite.
/// 3. **Sender binding** (when `require_sender_binding`): the attached
///    public key hashes to `sender`. Without this, anyone can sign a record
///    "from" someone else with their own key.
/// 4. **Signature**: Ed25519 over the canonical message, using the attached
///    public key.
///
/// # Errors
///
/// Returns the first failing check.
pub fn verify_transaction(
    tx: &Transaction,
    require_sender_binding: bool,
) -> Result<(), TransactionError> {
    // 1. Amount range.
    if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&tx.amount()) {
        return Err(TransactionError::AmountOutOfRange {
            amount: tx.amount(),
            min: MIN_AMOUNT,
            max: MAX_AMOUNT,
        });
    }

    // 2. Timestamp must be a real number; NaN has no canonical form.
    if !tx.timestamp().is_finite() {
        return Err(TransactionError::NonFiniteTimestamp);
    }

    // 3. Key belongs to the claimed sender.
    if require_sender_binding && !tx.sender().matches_public_key(tx.public_key()) {
        return Err(TransactionError::SenderKeyMismatch {
            sender: tx.sender().short(),
        });
    }

    // 4. Signature over the canonical bytes.
    let message = tx.signable_bytes();
    verify_detailed(tx.signature(), tx.public_key(), &message).map_err(|e| match e {
        SignatureError::InvalidSignatureBytes => TransactionError::MalformedSignature {
            reason: format!("expected 64 bytes, got {}", tx.signature().len()),
        },
        SignatureError::InvalidPublicKey => TransactionError::MalformedPublicKey {
            sender: tx.sender().short(),
        },
        SignatureError::VerificationFailed => TransactionError::InvalidSignature {
            sender: tx.sender().short(),
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
