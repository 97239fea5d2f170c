use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("malformed transaction record: {0}")]
    MalformedTransaction(String),

    #[error("malformed block record: {0}")]
    MalformedBlock(String),

    /// Every nonce up to `u64::MAX` was tried without meeting the target.
    #[error("nonce space exhausted while mining block {index}")]
    MiningExhausted { index: u64 },

    #[error("difficulty {difficulty} is out of range (max {max} hex digits)")]
    DifficultyOutOfRange { difficulty: u32, max: u32 },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
