use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Which chain invariant a block broke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    /// Stored hash differs from the recomputed one.
    HashMismatch,
    /// `previous_hash` does not match the prior block's stored hash.
    BrokenLink,
    /// Hash lacks the required leading zero hex digits.
    InsufficientWork,
    /// Block index differs from its position in the chain.
    IndexMismatch,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Violation::HashMismatch => "stored hash does not match block contents",
            Violation::BrokenLink => "previous hash does not link to prior block",
            Violation::InsufficientWork => "hash does not meet the difficulty target",
            Violation::IndexMismatch => "block index does not match chain position",
        };
        f.write_str(s)
    }
}

/// First failure found by [`crate::Ledger::verify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error, Serialize)]
#[error("block {index}: {violation}")]
pub struct ValidationFailure {
    pub index: u64,
    pub violation: Violation,
}
