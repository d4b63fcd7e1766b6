//! # Cryptographic Primitives
//!
//! Everything signature- and hash-related in gossipnet flows through here.
//!
//! - **Ed25519** for signatures. Authenticity is the only guarantee the
//!   protocol makes about a record.
//! - **BLAKE3** for deriving peer identifiers from public keys.
//!
//! Payloads are not encrypted. Confidentiality is not a goal.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, type-safe wrapper around audited
//! implementations.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, fingerprint};
pub use keys::{KeyError, NodeKeypair, PublicKey, Signature};
pub use signatures::{sign, verify, verify_detailed, SignatureError};
