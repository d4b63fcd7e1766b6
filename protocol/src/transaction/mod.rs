//! # Transaction Module
//!
//! Signed value-transfer records that nodes gossip to each other. There is
//! no ledger behind them: a transaction is accepted if its signature checks
//! out, then logged, and that is the end of its life.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        The Transaction record and its canonical signing bytes
//! signing.rs      Building a signed transaction from a keypair
//! verification.rs Checks a received transaction must pass before logging
//! log.rs          Bounded log of sent and accepted transactions
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Sign**: [`sign_transaction`] with the local keypair.
//! 2. **Send**: the gossip loop hands it to one random peer.
//! 3. **Verify**: the receiver runs [`verify_transaction`].
//! 4. **Log**: both sides append it to their [`TransactionLog`].

pub mod log;
pub mod signing;
pub mod types;
pub mod verification;

pub use log::{TransactionLog, TransactionLogEntry, TransactionLogSnapshot};
pub use signing::{current_timestamp, sign_transaction};
pub use types::{canonical_message, canonical_timestamp, Transaction};
pub use verification::{verify_transaction, TransactionError};
