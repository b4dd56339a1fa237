use serde::Serialize;

use crate::block::Block;
use crate::error::{ChainError, Rejection};
use crate::pow::meets_target;

/// Append-only sequence of blocks rooted at [`Block::genesis`]. There is no
/// fork tracking; the first valid block at an index wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    /// Adopts blocks as-is, e.g. from a bootnode snapshot.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ChainError> {
        if blocks.is_empty() {
            return Err(ChainError::Empty);
        }
        Ok(Self { blocks })
    }

    /// Like [`Chain::from_blocks`], but re-hashes every block and checks the
    /// genesis and every link.
    pub fn from_verified_blocks(blocks: Vec<Block>) -> Result<Self, ChainError> {
        let mut blocks = blocks.into_iter();
        let genesis = blocks.next().ok_or(ChainError::Empty)?;
        if genesis != Block::genesis() {
            return Err(ChainError::ForeignGenesis);
        }
        let mut chain = Self {
            blocks: vec![genesis],
        };
        for block in blocks {
            let block = Block::from_serialized(block)?;
            let tip = chain.tip();
            if block.previous_hash != tip.hash || tip.index.checked_add(1) != Some(block.index) {
                return Err(ChainError::BrokenLink { index: block.index });
            }
            chain.push(block);
        }
        Ok(chain)
    }

    pub fn tip(&self) -> &Block {
        // never empty: every constructor starts from at least one block
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Runs the admission checks for a block mined by a peer, in order:
    /// proof of work, parent hash, index, then hash integrity. Hands the
    /// block back once it passes.
    pub fn validate_incoming(&self, block: Block) -> Result<Block, Rejection> {
        let tip = self.tip();
        if !meets_target(&block.hash) {
            return Err(Rejection::InsufficientWork(block.hash));
        }
        if block.previous_hash != tip.hash {
            return Err(Rejection::PreviousHashMismatch {
                tip: tip.hash.clone(),
                got: block.previous_hash,
            });
        }
        if block.index <= tip.index {
            return Err(Rejection::StaleIndex {
                tip: tip.index,
                got: block.index,
            });
        }
        // nothing could ever be built on top of it
        if block.index == u64::MAX {
            return Err(Rejection::IndexOutOfRange(block.index));
        }
        let block = Block::from_serialized(block)?;
        if block.data.is_empty() {
            return Err(Rejection::EmptyData);
        }
        Ok(block)
    }

    pub(crate) fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Transaction;
    use crate::pow::mine_block;

    fn mined_child(parent: &Block) -> Block {
        mine_block(Block::next(parent, vec![Transaction::new("A", "B", 1)]).unwrap())
    }

    #[test]
    fn new_chain_holds_only_genesis() {
        let chain = Chain::new();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.tip(), &Block::genesis());
    }

    #[test]
    fn accepts_properly_mined_child() {
        let chain = Chain::new();
        let block = mined_child(chain.tip());
        assert_eq!(chain.validate_incoming(block.clone()), Ok(block));
    }

    #[test]
    fn rejects_unmined_block_first() {
        let chain = Chain::new();
        let mut block = Block::next(chain.tip(), vec![Transaction::new("A", "B", 1)]).unwrap();
        block.hash = format!("fff{}", &block.hash[3..]);
        block.previous_hash = "elsewhere".into();
        assert!(matches!(
            chain.validate_incoming(block),
            Err(Rejection::InsufficientWork(_))
        ));
    }

    #[test]
    fn rejects_wrong_parent() {
        let chain = Chain::new();
        let mut other = Block::genesis();
        other.hash = "abc".into();
        let block = mined_child(&other);
        assert!(matches!(
            chain.validate_incoming(block),
            Err(Rejection::PreviousHashMismatch { .. })
        ));
    }

    #[test]
    fn rejects_index_not_above_tip() {
        let chain = Chain::new();
        let mut block = Block::next(chain.tip(), vec![Transaction::new("A", "B", 1)]).unwrap();
        block.index = 0;
        let block = mine_block(block);
        assert_eq!(
            chain.validate_incoming(block),
            Err(Rejection::StaleIndex { tip: 0, got: 0 })
        );
    }

    #[test]
    fn rejects_last_possible_index() {
        let chain = Chain::new();
        let mut block = Block::next(chain.tip(), vec![Transaction::new("A", "B", 1)]).unwrap();
        block.index = u64::MAX;
        let block = mine_block(block);
        assert_eq!(
            chain.validate_incoming(block),
            Err(Rejection::IndexOutOfRange(u64::MAX))
        );
    }

    #[test]
    fn rejects_forged_hash_with_valid_prefix() {
        let chain = Chain::new();
        let mut block = mined_child(chain.tip());
        block.data[0].amount = 99;
        assert!(matches!(
            chain.validate_incoming(block),
            Err(Rejection::Integrity(_))
        ));
    }

    #[test]
    fn rejects_block_without_transactions() {
        let chain = Chain::new();
        let block = mine_block(Block::next(chain.tip(), vec![]).unwrap());
        assert_eq!(chain.validate_incoming(block), Err(Rejection::EmptyData));
    }

    #[test]
    fn verified_blocks_must_link() {
        let genesis = Block::genesis();
        let first = mined_child(&genesis);
        let second = mined_child(&first);
        let chain =
            Chain::from_verified_blocks(vec![genesis.clone(), first, second.clone()])
                .unwrap();
        assert_eq!(chain.len(), 3);
        for pair in chain.blocks().windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash);
            assert_eq!(pair[1].index, pair[0].index + 1);
        }

        assert_eq!(
            Chain::from_verified_blocks(vec![genesis, second]),
            Err(ChainError::BrokenLink { index: 2 })
        );
    }

    #[test]
    fn verified_blocks_need_builtin_genesis() {
        let mut genesis = Block::genesis();
        genesis.timestamp += 1;
        assert_eq!(
            Chain::from_verified_blocks(vec![genesis]),
            Err(ChainError::ForeignGenesis)
        );
        assert_eq!(Chain::from_blocks(vec![]), Err(ChainError::Empty));
    }
}
