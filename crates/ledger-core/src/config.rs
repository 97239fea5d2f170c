use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use crate::{LedgerError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningStrategy {
    #[default]
    Sequential,
    /// Search nonces on the rayon thread pool.
    Parallel,
}

/// Fixed for the lifetime of a [`crate::Ledger`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Leading zero hex digits required of every mined block hash.
    pub difficulty: u32,
    pub mining: MiningStrategy,
    /// Pin the genesis timestamp; current time when unset.
    pub genesis_timestamp: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining: MiningStrategy::Sequential,
            genesis_timestamp: None,
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::DifficultyOutOfRange {
                difficulty: self.difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        Ok(())
    }
}
