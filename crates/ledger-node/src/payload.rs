use ledger_core::Block;
use serde::{Deserialize, Serialize};

use crate::error::NodeError;

/// Body of `POST /blocks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEnvelope {
    pub block: BlockPayload,
}

/// Peers send the block either as its JSON text or as an inline object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockPayload {
    Encoded(String),
    Inline(Block),
}

impl BlockEnvelope {
    /// The form pushed to peers: pretty-printed JSON text.
    pub fn encode(block: &Block) -> Result<Self, NodeError> {
        let text = serde_json::to_string_pretty(block)
            .map_err(|e| NodeError::Internal(format!("encode block: {e}")))?;
        Ok(Self {
            block: BlockPayload::Encoded(text),
        })
    }

    /// Decodes the fields only; the hash is re-checked by
    /// [`Block::from_serialized`] once the chain's earlier checks pass, so
    /// rejections are reported in check order.
    pub fn into_block(self) -> Result<Block, NodeError> {
        match self.block {
            BlockPayload::Inline(block) => Ok(block),
            BlockPayload::Encoded(text) => Block::decode(&text)
                .map_err(|e| NodeError::InvalidRequest(format!("undecodable block: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::Transaction;

    #[test]
    fn encoded_and_inline_forms_decode_alike() {
        let block = Block::next(&Block::genesis(), vec![Transaction::new("A", "B", 1)]).unwrap();

        let encoded = BlockEnvelope::encode(&block).unwrap();
        let wire = serde_json::to_string(&encoded).unwrap();
        let back: BlockEnvelope = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.into_block().unwrap(), block);

        let inline = serde_json::json!({ "block": block });
        let back: BlockEnvelope = serde_json::from_value(inline).unwrap();
        assert_eq!(back.into_block().unwrap(), block);
    }

    #[test]
    fn garbage_text_is_invalid_request() {
        let env = BlockEnvelope {
            block: BlockPayload::Encoded("not json".into()),
        };
        assert!(matches!(env.into_block(), Err(NodeError::InvalidRequest(_))));
    }
}
