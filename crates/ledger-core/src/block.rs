use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{GENESIS_HASH, GENESIS_TIMESTAMP, HASH_HEX_SIZE};
use crate::error::BlockError;

type HmacSha256 = Hmac<Sha256>;

/// A balance transfer. Signatures are not part of the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub from_address: String,
    pub to_address: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        Self {
            from_address: from.into(),
            to_address: to.into(),
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub data: Vec<Transaction>,
    pub nonce: u64,
    pub hash: String,
}

/// The hashed view of a block: every field except `hash`, in wire order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashInput<'a> {
    index: u64,
    previous_hash: &'a str,
    timestamp: u64,
    data: &'a [Transaction],
    nonce: u64,
}

/// HMAC-SHA256 keyed by the compact JSON of the block fields, over an empty
/// message, rendered as lowercase hex.
pub fn hash_fields(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    data: &[Transaction],
    nonce: u64,
) -> String {
    let key = serde_json::to_vec(&HashInput {
        index,
        previous_hash,
        timestamp,
        data,
        nonce,
    })
    .expect("block fields are plain strings and integers");
    let mac = HmacSha256::new_from_slice(&key).expect("HMAC can take key of any size");
    hex::encode(mac.finalize().into_bytes())
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl Block {
    pub fn calculate_hash(&self) -> String {
        hash_fields(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.data,
            self.nonce,
        )
    }

    /// The fixed first block of every chain.
    pub fn genesis() -> Self {
        Self {
            index: 0,
            previous_hash: String::new(),
            timestamp: GENESIS_TIMESTAMP,
            data: vec![],
            nonce: 0,
            hash: GENESIS_HASH.to_string(),
        }
    }

    /// Builds the successor of `previous` stamped with the current time. The
    /// nonce starts at zero, so the hash is not yet mined.
    pub fn next(previous: &Block, data: Vec<Transaction>) -> Result<Self, BlockError> {
        Self::next_at(previous, data, now_millis())
    }

    pub fn next_at(
        previous: &Block,
        data: Vec<Transaction>,
        timestamp: u64,
    ) -> Result<Self, BlockError> {
        let index = previous
            .index
            .checked_add(1)
            .ok_or(BlockError::IndexOverflow {
                index: previous.index,
            })?;
        let mut block = Self {
            index,
            previous_hash: previous.hash.clone(),
            timestamp,
            data,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        Ok(block)
    }

    /// Accepts decoded fields only if the stored hash is reproduced exactly.
    pub fn from_serialized(fields: Block) -> Result<Self, BlockError> {
        fields.verify_hash()?;
        Ok(fields)
    }

    /// Parses the JSON text of a block and checks its integrity.
    pub fn from_json(text: &str) -> Result<Self, BlockError> {
        Self::from_serialized(Self::decode(text)?)
    }

    /// Parses the fields only; [`Block::from_serialized`] checks the hash.
    pub fn decode(text: &str) -> Result<Block, BlockError> {
        serde_json::from_str(text).map_err(|e| BlockError::Malformed(e.to_string()))
    }

    pub fn verify_hash(&self) -> Result<(), BlockError> {
        let recomputed = self.calculate_hash();
        if self.hash.len() != HASH_HEX_SIZE || recomputed != self.hash {
            return Err(BlockError::HashMismatch {
                stored: self.hash.clone(),
                recomputed,
            });
        }
        Ok(())
    }
}
