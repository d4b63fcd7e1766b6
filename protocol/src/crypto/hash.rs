//! # Hashing Utilities
//!
//! BLAKE3 is the only hash in gossipnet. It derives peer identifiers from
//! verifying keys and fingerprints wire frames in trace logs.

/// BLAKE3 digest of `data`.
///
/// # Example
///
/// ```
/// use gossipnet_protocol::crypto::blake3_hash;
///
/// let digest = blake3_hash(b"gossipnet");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Short hex fingerprint of `data`, for log lines.
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(&blake3_hash(data)[..4])
}
