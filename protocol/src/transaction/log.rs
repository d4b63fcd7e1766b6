//! Bounded, append-only log of transactions a node has sent or accepted.
//!
//! The log keeps a trimmed projection of each transaction (short peer
//! prefixes, amount, timestamp), not the signed record. It exists for
//! humans and the status API; nothing in the protocol reads it back.
//!
//! ## Concurrency
//!
//! The gossip loop is the only writer. Readers (the HTTP API, tests) take
//! a read lock and copy out what they need, so a snapshot never observes a
//! half-applied append.

use std::collections::VecDeque;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::types::Transaction;
use crate::config::TRANSACTION_LOG_CAPACITY;

/// One row of the transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    pub sender: String,
    pub receiver: String,
    pub amount: u32,
    pub timestamp: f64,
}

impl From<&Transaction> for TransactionLogEntry {
    fn from(tx: &Transaction) -> Self {
        Self {
            sender: tx.sender().short(),
            receiver: tx.receiver().short(),
            amount: tx.amount(),
            timestamp: tx.timestamp(),
        }
    }
}

/// Point-in-time copy of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLogSnapshot {
    /// Bumped on every append.
    pub version: u64,
    /// Appends since the node started, including evicted ones.
    pub total_recorded: u64,
    /// Oldest first.
    pub entries: Vec<TransactionLogEntry>,
}

#[derive(Debug)]
struct LogInner {
    entries: VecDeque<TransactionLogEntry>,
    capacity: usize,
    total_recorded: u64,
}

/// Thread-safe bounded transaction log. When full, the oldest entry is
/// evicted to make room.
#[derive(Debug)]
pub struct TransactionLog {
    inner: RwLock<LogInner>,
}

impl TransactionLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(LogInner {
                entries: VecDeque::with_capacity(capacity.min(TRANSACTION_LOG_CAPACITY)),
                capacity,
                total_recorded: 0,
            }),
        }
    }

    /// Append the projection of `tx` and return it.
    pub fn record(&self, tx: &Transaction) -> TransactionLogEntry {
        let entry = TransactionLogEntry::from(tx);
        let mut inner = self.inner.write();
        if inner.entries.len() == inner.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(entry.clone());
        inner.total_recorded += 1;
        entry
    }

    /// The last `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<TransactionLogEntry> {
        let inner = self.inner.read();
        let skip = inner.entries.len().saturating_sub(limit);
        inner.entries.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> TransactionLogSnapshot {
        let inner = self.inner.read();
        TransactionLogSnapshot {
            version: inner.total_recorded,
            total_recorded: inner.total_recorded,
            entries: inner.entries.iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    pub fn total_recorded(&self) -> u64 {
        self.inner.read().total_recorded
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new(TRANSACTION_LOG_CAPACITY)
    }
}
