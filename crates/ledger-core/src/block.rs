use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    canonical,
    constants::MAX_DIFFICULTY,
    pow::{self, meets_difficulty},
    FieldMap, HexDigest, LedgerError, Result, Transaction,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix seconds.
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: HexDigest,
    #[serde(default)]
    pub validator: Option<String>,
    #[serde(default)]
    pub nonce: u64,
    pub hash: HexDigest,
}

/// Everything the block hash covers except the nonce, with transaction
/// hashes computed once so a nonce search does not rehash them.
struct HashInput<'a> {
    index: u64,
    timestamp: u64,
    tx_hashes: Vec<HexDigest>,
    previous_hash: &'a str,
    validator: Option<&'a str>,
}

impl HashInput<'_> {
    fn digest(&self, nonce: u64) -> HexDigest {
        canonical::digest_value(&json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": self.tx_hashes,
            "previous_hash": self.previous_hash,
            "validator": self.validator,
            "nonce": nonce,
        }))
    }
}

impl Block {
    /// Unmined block: nonce 0, hash computed over the given fields.
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<HexDigest>,
        validator: Option<String>,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash: previous_hash.into(),
            validator,
            nonce: 0,
            hash: HexDigest::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    fn hash_input(&self) -> HashInput<'_> {
        HashInput {
            index: self.index,
            timestamp: self.timestamp,
            tx_hashes: self.transactions.iter().map(Transaction::hash).collect(),
            previous_hash: &self.previous_hash,
            validator: self.validator.as_deref(),
        }
    }

    /// Recompute the hash from the current fields. Does not touch `self.hash`.
    pub fn calculate_hash(&self) -> HexDigest {
        self.hash_input().digest(self.nonce)
    }

    pub fn is_hash_consistent(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    /// Advance the nonce from its current value until the hash has
    /// `difficulty` leading zero hex digits.
    pub fn mine(&mut self, difficulty: u32) -> Result<()> {
        self.search(difficulty, false)
    }

    /// Parallel variant of [`Block::mine`]; lands on the same nonce.
    pub fn mine_parallel(&mut self, difficulty: u32) -> Result<()> {
        self.search(difficulty, true)
    }

    fn search(&mut self, difficulty: u32, parallel: bool) -> Result<()> {
        if difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::DifficultyOutOfRange {
                difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        debug!(index = self.index, difficulty, parallel, "mining block");
        let found = {
            let input = self.hash_input();
            let digest_at = |nonce: u64| input.digest(nonce);
            if parallel {
                pow::search_parallel(self.nonce, difficulty, digest_at)
            } else {
                pow::search_sequential(self.nonce, difficulty, digest_at)
            }
        };
        let (nonce, hash) = found.ok_or(LedgerError::MiningExhausted { index: self.index })?;
        self.nonce = nonce;
        self.hash = hash;
        info!(
            "Mined block {} with nonce {} and hash {}",
            self.index, self.nonce, self.hash
        );
        Ok(())
    }

    pub fn to_record(&self) -> FieldMap {
        let mut record = FieldMap::new();
        record.insert("index".into(), Value::from(self.index));
        record.insert("timestamp".into(), Value::from(self.timestamp));
        record.insert(
            "transactions".into(),
            Value::Array(
                self.transactions
                    .iter()
                    .map(|tx| Value::Object(tx.to_record()))
                    .collect(),
            ),
        );
        record.insert("previous_hash".into(), Value::from(self.previous_hash.clone()));
        record.insert("hash".into(), Value::from(self.hash.clone()));
        record.insert(
            "validator".into(),
            self.validator.clone().map_or(Value::Null, Value::String),
        );
        record.insert("nonce".into(), Value::from(self.nonce));
        record
    }

    /// Rebuild a block from its record. The stored hash is kept as-is, so a
    /// forged record loads fine and is only caught by chain verification.
    pub fn from_record(record: &FieldMap) -> Result<Self> {
        serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| LedgerError::MalformedBlock(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GENESIS_PREVIOUS_HASH, HASH_HEX_SIZE};

    fn sample_txs() -> Vec<Transaction> {
        vec![
            Transaction::new("Alice", "Bob", 10).with_timestamp(1_600_000_000),
            Transaction::new("Bob", "Charlie", 5).with_timestamp(1_600_000_100),
        ]
    }

    fn sample_block() -> Block {
        Block::new(
            1,
            1_600_000_200,
            sample_txs(),
            GENESIS_PREVIOUS_HASH,
            Some("V1".to_string()),
        )
    }

    #[test]
    fn new_block_starts_consistent_at_nonce_zero() {
        let block = sample_block();
        assert_eq!(block.nonce, 0);
        assert_eq!(block.hash.len(), HASH_HEX_SIZE);
        assert!(block.is_hash_consistent());
    }

    #[test]
    fn block_hash_consistency() {
        let block = sample_block();
        assert_eq!(block.calculate_hash(), block.calculate_hash());
        assert_eq!(block.calculate_hash(), sample_block().calculate_hash());
    }

    #[test]
    fn block_hash_changes_with_nonce() {
        let mut block = sample_block();
        let before = block.calculate_hash();
        block.nonce += 1;
        assert_ne!(before, block.calculate_hash());
    }

    #[test]
    fn transaction_order_matters() {
        let mut reversed = sample_txs();
        reversed.reverse();
        let other = Block::new(
            1,
            1_600_000_200,
            reversed,
            GENESIS_PREVIOUS_HASH,
            Some("V1".to_string()),
        );
        assert_ne!(sample_block().hash, other.hash);
    }

    #[test]
    fn absent_validator_differs_from_present() {
        let mut block = sample_block();
        block.validator = None;
        assert_ne!(block.calculate_hash(), sample_block().hash);
    }

    #[test]
    fn calculate_hash_does_not_mutate() {
        let mut block = sample_block();
        block.nonce = 7;
        let stored = block.hash.clone();
        let _ = block.calculate_hash();
        assert_eq!(block.hash, stored);
        assert!(!block.is_hash_consistent());
    }

    #[test]
    fn mine_block_example() {
        let mut block = sample_block();
        block.mine(2).unwrap();
        assert!(block.hash.starts_with("00"));
        assert!(block.is_hash_consistent());
        assert!(block.meets_difficulty(2));
    }

    #[test]
    fn mining_is_deterministic() {
        let mut a = sample_block();
        let mut b = sample_block();
        a.mine(2).unwrap();
        b.mine(2).unwrap();
        assert_eq!((a.nonce, &a.hash), (b.nonce, &b.hash));
    }

    #[test]
    fn parallel_mining_lands_on_the_same_nonce() {
        let mut seq = sample_block();
        let mut par = sample_block();
        seq.mine(3).unwrap();
        par.mine_parallel(3).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn zero_difficulty_keeps_nonce_zero() {
        let mut block = sample_block();
        let before = block.hash.clone();
        block.mine(0).unwrap();
        assert_eq!(block.nonce, 0);
        assert_eq!(block.hash, before);
    }

    #[test]
    fn impossible_difficulty_is_rejected() {
        let mut block = sample_block();
        assert_eq!(
            block.mine(MAX_DIFFICULTY + 1),
            Err(LedgerError::DifficultyOutOfRange {
                difficulty: MAX_DIFFICULTY + 1,
                max: MAX_DIFFICULTY,
            })
        );
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn exhausted_nonce_space_is_an_error() {
        let mut block = sample_block();
        block.nonce = u64::MAX;
        // One candidate left; 64 leading zeros will not happen.
        assert_eq!(
            block.mine(MAX_DIFFICULTY),
            Err(LedgerError::MiningExhausted { index: 1 })
        );
    }

    #[test]
    fn record_round_trip_keeps_stored_hash() {
        let mut block = sample_block();
        block.mine(1).unwrap();
        let back = Block::from_record(&block.to_record()).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn forged_hash_survives_deserialization() {
        let mut record = sample_block().to_record();
        record.insert("hash".into(), Value::from("f".repeat(64)));
        let block = Block::from_record(&record).unwrap();
        assert_eq!(block.hash, "f".repeat(64));
        assert!(!block.is_hash_consistent());
    }

    #[test]
    fn record_defaults_nonce_and_validator() {
        let mut record = sample_block().to_record();
        record.remove("nonce");
        record.remove("validator");
        let block = Block::from_record(&record).unwrap();
        assert_eq!(block.nonce, 0);
        assert_eq!(block.validator, None);
    }

    #[test]
    fn missing_hash_is_malformed() {
        let mut record = sample_block().to_record();
        record.remove("hash");
        assert!(matches!(
            Block::from_record(&record),
            Err(LedgerError::MalformedBlock(_))
        ));
    }

    #[test]
    fn bad_transaction_entry_is_malformed() {
        let mut record = sample_block().to_record();
        record.insert(
            "transactions".into(),
            serde_json::json!([{ "sender": "A", "recipient": "B" }]),
        );
        assert!(matches!(
            Block::from_record(&record),
            Err(LedgerError::MalformedBlock(_))
        ));
    }

    #[test]
    fn block_serialization_example() {
        let block = sample_block();
        let json = serde_json::to_string(&block).unwrap();
        let deserialized: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block, deserialized);
    }
}
