//! Append-only proof-of-work ledger.
//!
//! Transactions queue in a [`Ledger`]'s pending buffer until
//! [`Ledger::mine_pending`] packs them into a [`Block`], searches for a nonce
//! whose hash has enough leading zero hex digits, and appends the block.
//! Hashes are SHA-256 over a key-sorted JSON encoding of each record.

pub mod block;
pub mod canonical;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod pow;
pub mod transaction;
pub mod validation;

use std::time::{SystemTime, UNIX_EPOCH};

pub use block::Block;
pub use chain::{genesis_block, Ledger};
pub use config::{LedgerConfig, MiningStrategy};
pub use error::{LedgerError, Result};
pub use transaction::Transaction;
pub use validation::{ValidationFailure, Violation};

/// Lowercase hex SHA-256 digest, 64 characters.
pub type HexDigest = String;

/// Record form of a transaction or block, keyed by field name.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
