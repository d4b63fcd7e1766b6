// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # gossipnet Core Library
//!
//! A small peer-to-peer gossip network. Every node has an Ed25519 identity,
//! periodically signs a random transfer to one random neighbor, and keeps
//! telling all of its neighbors who it is connected to. From those
//! announcements each node assembles its own picture of the whole network.
//!
//! There is no ledger and no consensus here. A transaction is a signed
//! statement, checked and logged by whoever receives it. The interesting
//! part is the topology merge: independent, unordered announcements that
//! converge on the same graph everywhere.
//!
//! ## Architecture
//!
//! - **crypto**: Ed25519 signing and verification, BLAKE3 hashing.
//! - **identity**: peer ids derived from public keys.
//! - **transaction**: the signed record, its verification, the bounded log.
//! - **topology**: the known-topology graph and announcement merge.
//! - **network**: wire format, transport contract, the gossip node loop.
//! - **config**: protocol constants and node tuning.
//!
//! ## Design Philosophy
//!
//! 1. Nothing a peer sends can crash a node. Bad input is logged and dropped.
//! 2. Observers read snapshots, never live state.
//! 3. The node does not care what carries its frames.

pub mod config;
pub mod crypto;
pub mod identity;
pub mod network;
pub mod topology;
pub mod transaction;
