//! # Identity Module
//!
//! Node identity: an Ed25519 keypair (see [`crate::crypto::keys`]) and the
//! [`PeerId`] derived from its public half. Peer ids are what every other
//! component keys on: topology nodes, edges, transaction senders and
//! receivers.

pub mod peer_id;

pub use crate::crypto::keys::{NodeKeypair, PublicKey};
pub use peer_id::{PeerId, PeerIdError};
