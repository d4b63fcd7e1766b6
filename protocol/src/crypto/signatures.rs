//! # Digital Signatures
//!
//! Detached Ed25519 signing and verification over raw byte strings.
//!
//! Gossip ingestion treats verification as a total function: whatever
//! arrives off the wire, [`verify`] answers `true` or `false` and never
//! panics. Malformed keys and malformed signatures are just two more ways
//! of saying "nope", each leaving a debug line behind for whoever is
//! reading the logs.
//!
//! [`verify_detailed`] is the same check with a typed failure reason, for
//! callers that want to report *why* a record was dropped.
//!
//! ## Strictness
//!
//! We use `verify_strict`, which rejects small-order keys and
//! non-canonical signatures that lenient verifiers accept.

use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};
use thiserror::Error;
use tracing::debug;

use super::keys::NodeKeypair;
use crate::config::{SIGNATURE_LENGTH, VERIFYING_KEY_LENGTH};

/// Why a signature check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignatureBytes,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Sign `message` with the node keypair and return the raw 64-byte
/// signature.
///
/// # Example
///
/// ```
/// use gossipnet_protocol::crypto::{sign, verify, NodeKeypair};
///
/// let keypair = NodeKeypair::generate();
/// let signature = sign(&keypair, b"send 42");
/// assert!(verify(&signature, keypair.public_key().as_bytes(), b"send 42"));
/// ```
pub fn sign(keypair: &NodeKeypair, message: &[u8]) -> Vec<u8> {
    keypair.sign(message).into_bytes()
}

/// Verify a detached signature given as raw bytes.
///
/// Never fails loudly: every rejection is a `false` plus a debug
/// diagnostic.
pub fn verify(signature: &[u8], public_key: &[u8], message: &[u8]) -> bool {
    match verify_detailed(signature, public_key, message) {
        Ok(()) => true,
        Err(e) => {
            debug!(
                error = %e,
                signature_len = signature.len(),
                public_key_len = public_key.len(),
                "signature rejected"
            );
            false
        }
    }
}

/// Verify a detached signature and say why it failed.
pub fn verify_detailed(
    signature: &[u8],
    public_key: &[u8],
    message: &[u8],
) -> Result<(), SignatureError> {
    let key_bytes: [u8; VERIFYING_KEY_LENGTH] = public_key
        .try_into()
        .map_err(|_| SignatureError::InvalidPublicKey)?;
    let verifying_key =
        VerifyingKey::from_bytes(&key_bytes).map_err(|_| SignatureError::InvalidPublicKey)?;

    let sig_bytes: [u8; SIGNATURE_LENGTH] = signature
        .try_into()
        .map_err(|_| SignatureError::InvalidSignatureBytes)?;
    let signature = DalekSignature::from_bytes(&sig_bytes);

    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}
