//! The ledger: mined blocks plus the buffer of transactions waiting for one.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::{
    config::{LedgerConfig, MiningStrategy},
    constants::{GENESIS_PREVIOUS_HASH, GENESIS_VALIDATOR},
    unix_now,
    validation::{ValidationFailure, Violation},
    Block, FieldMap, LedgerError, Result, Transaction,
};

/// An append-only chain that always starts with a genesis block.
///
/// Not internally synchronized; wrap it in a lock to share it.
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(difficulty: u32) -> Result<Self> {
        Self::with_config(LedgerConfig::with_difficulty(difficulty))
    }

    pub fn with_config(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let genesis = genesis_block(config.genesis_timestamp.unwrap_or_else(unix_now));
        info!(
            difficulty = config.difficulty,
            hash = %genesis.hash,
            "ledger created with genesis block"
        );
        Ok(Self {
            chain: vec![genesis],
            pending: Vec::new(),
            config,
        })
    }

    /// Adopt an existing chain as-is. Stored hashes are trusted; call
    /// [`Ledger::verify`] to check them.
    pub fn from_blocks(blocks: Vec<Block>, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        if blocks.is_empty() {
            return Err(LedgerError::MalformedBlock(
                "chain has no genesis block".to_string(),
            ));
        }
        Ok(Self {
            chain: blocks,
            pending: Vec::new(),
            config,
        })
    }

    pub fn from_records(records: &[FieldMap], config: LedgerConfig) -> Result<Self> {
        let blocks = records
            .iter()
            .map(Block::from_record)
            .collect::<Result<Vec<_>>>()?;
        Self::from_blocks(blocks, config)
    }

    pub fn to_records(&self) -> Vec<FieldMap> {
        self.chain.iter().map(Block::to_record).collect()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.chain.get(i))
    }

    pub fn latest_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger always holds a genesis block")
    }

    /// Index of the latest block; 0 when only genesis exists.
    pub fn height(&self) -> u64 {
        self.latest_block().index
    }

    pub fn submit_transaction(&mut self, tx: Transaction) {
        debug!(
            sender = %tx.sender,
            recipient = %tx.recipient,
            amount = tx.amount,
            "transaction queued"
        );
        self.pending.push(tx);
    }

    /// Move the whole pending buffer into a new block, mine it and append it.
    ///
    /// On failure the taken transactions go back to the front of the buffer.
    pub fn mine_pending(&mut self, validator_id: &str) -> Result<Block> {
        let transactions = std::mem::take(&mut self.pending);
        let mut block = Block::new(
            self.chain.len() as u64,
            unix_now(),
            transactions,
            self.latest_block().hash.clone(),
            Some(validator_id.to_string()),
        );

        let mined = match self.config.mining {
            MiningStrategy::Sequential => block.mine(self.config.difficulty),
            MiningStrategy::Parallel => block.mine_parallel(self.config.difficulty),
        };
        if let Err(e) = mined {
            warn!(index = block.index, error = %e, "mining failed; restoring pending transactions");
            let mut restored = block.transactions;
            restored.append(&mut self.pending);
            self.pending = restored;
            return Err(e);
        }

        self.chain.push(block.clone());
        Ok(block)
    }

    /// Check every block and report the first one that breaks an invariant.
    ///
    /// Genesis is checked for hash consistency and position only.
    pub fn verify(&self) -> std::result::Result<(), ValidationFailure> {
        let difficulty = self.config.difficulty;
        for (position, block) in self.chain.iter().enumerate() {
            let fail = |violation| ValidationFailure {
                index: position as u64,
                violation,
            };
            if !block.is_hash_consistent() {
                return Err(fail(Violation::HashMismatch));
            }
            if position > 0 {
                if block.previous_hash != self.chain[position - 1].hash {
                    return Err(fail(Violation::BrokenLink));
                }
                if !block.meets_difficulty(difficulty) {
                    return Err(fail(Violation::InsufficientWork));
                }
            }
            if block.index != position as u64 {
                return Err(fail(Violation::IndexMismatch));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> bool {
        match self.verify() {
            Ok(()) => true,
            Err(failure) => {
                warn!(%failure, "chain validation failed");
                false
            }
        }
    }

    /// Net of every mined transfer touching `address`. Pending transactions
    /// do not count.
    pub fn balance_of(&self, address: &str) -> i128 {
        self.chain
            .iter()
            .flat_map(|block| &block.transactions)
            .fold(0i128, |mut balance, tx| {
                if tx.sender == address {
                    balance -= i128::from(tx.amount);
                }
                if tx.recipient == address {
                    balance += i128::from(tx.amount);
                }
                balance
            })
    }

    /// Balance of every address that appears in a mined transaction.
    pub fn balances(&self) -> BTreeMap<String, i128> {
        let mut balances = BTreeMap::new();
        for tx in self.chain.iter().flat_map(|block| &block.transactions) {
            let amount = i128::from(tx.amount);
            *balances.entry(tx.sender.clone()).or_insert(0) -= amount;
            *balances.entry(tx.recipient.clone()).or_insert(0) += amount;
        }
        balances
    }
}

/// A zero-transaction genesis block: computed hash, never mined.
pub fn genesis_block(timestamp: u64) -> Block {
    Block::new(
        0,
        timestamp,
        Vec::new(),
        GENESIS_PREVIOUS_HASH,
        Some(GENESIS_VALIDATOR.to_string()),
    )
}
