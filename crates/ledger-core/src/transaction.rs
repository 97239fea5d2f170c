use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{canonical, unix_now, FieldMap, HexDigest, LedgerError, Result};

/// A value transfer between two addresses.
///
/// No admission rules apply: negative amounts and self-transfers are valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: i64,
    /// Unix seconds.
    pub timestamp: u64,
    /// Opaque; never verified.
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub metadata: Option<FieldMap>,
}

impl Transaction {
    /// A transfer stamped with the current time.
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: i64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            timestamp: unix_now(),
            signature: None,
            metadata: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_metadata(mut self, metadata: FieldMap) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// SHA-256 over the canonical encoding of all six fields.
    pub fn hash(&self) -> HexDigest {
        canonical::digest_value(&Value::Object(self.to_record()))
    }

    pub fn to_record(&self) -> FieldMap {
        let mut record = FieldMap::new();
        record.insert("sender".into(), Value::from(self.sender.clone()));
        record.insert("recipient".into(), Value::from(self.recipient.clone()));
        record.insert("amount".into(), Value::from(self.amount));
        record.insert("timestamp".into(), Value::from(self.timestamp));
        record.insert(
            "signature".into(),
            self.signature.clone().map_or(Value::Null, Value::String),
        );
        record.insert(
            "metadata".into(),
            self.metadata.clone().map_or(Value::Null, Value::Object),
        );
        record
    }

    pub fn from_record(record: &FieldMap) -> Result<Self> {
        serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| LedgerError::MalformedTransaction(e.to_string()))
    }
}
