use serde::Serialize;
use tracing::{debug, info};

use crate::block::{Block, Transaction};
use crate::chain::Chain;
use crate::error::{CommitError, Rejection};
use crate::ledger::Ledger;

/// The chain and the balances derived from it. Every mutation goes through
/// one of the methods below so callers can hold a single lock around it.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LedgerState {
    #[serde(rename = "state")]
    ledger: Ledger,
    #[serde(rename = "blocks")]
    chain: Chain,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn tip(&self) -> &Block {
        self.chain.tip()
    }

    /// Swaps in a snapshot wholesale.
    pub fn replace(&mut self, chain: Chain, ledger: Ledger) {
        info!(
            blocks = chain.len(),
            accounts = ledger.balances().len(),
            "replacing local chain and ledger"
        );
        self.chain = chain;
        self.ledger = ledger;
    }

    pub fn credit_if_unseen(&mut self, address: &str) -> i64 {
        self.ledger.credit_if_unseen(address)
    }

    /// Checks the sender can pay and builds the unmined block that would
    /// carry `tx` on top of the current tip. Nothing is recorded.
    pub fn prepare_transaction(&self, tx: Transaction) -> Result<Block, CommitError> {
        self.ledger.ensure_funds(&tx.from_address, tx.amount)?;
        Ok(Block::next(self.chain.tip(), vec![tx])?)
    }

    /// Commits a block mined by this node: the tip must still be its parent,
    /// and every transaction is transferred with a funds check. Balances and
    /// chain change together or not at all.
    pub fn commit_mined(&mut self, block: Block) -> Result<&Block, CommitError> {
        let tip = self.chain.tip();
        if block.previous_hash != tip.hash || tip.index.checked_add(1) != Some(block.index) {
            return Err(CommitError::StaleTip {
                tip: tip.hash.clone(),
                parent: block.previous_hash.clone(),
            });
        }
        if block.data.is_empty() {
            return Err(CommitError::EmptyData);
        }
        let mut ledger = self.ledger.clone();
        for tx in &block.data {
            ledger.transfer(&tx.from_address, &tx.to_address, tx.amount)?;
        }
        self.ledger = ledger;
        info!(index = block.index, hash = %block.hash, "committed mined block");
        self.chain.push(block);
        Ok(self.chain.tip())
    }

    /// Validates a block mined elsewhere and, if it passes, applies only its
    /// first transaction to the balances before appending it. Later
    /// transactions are stored but never change a balance.
    pub fn accept_block(&mut self, block: Block) -> Result<&Block, Rejection> {
        let block = self.chain.validate_incoming(block)?;
        let first = block.data.first().ok_or(Rejection::EmptyData)?;
        if let Err(err) = self.ledger.apply_unchecked(first) {
            debug!(%err, "first transaction of inbound block left balances unchanged");
        }
        info!(index = block.index, hash = %block.hash, "accepted block from peer");
        self.chain.push(block);
        Ok(self.chain.tip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GENESIS_HASH;
    use crate::error::{BlockError, LedgerError};
    use crate::pow::mine_block;

    fn fixture_block() -> Block {
        // index 1 on genesis, mined offline: nonce 4831
        let mut block = Block::next_at(
            &Block::genesis(),
            vec![Transaction::new("A", "B", 30)],
            1_522_983_400_000,
        )
        .unwrap();
        block.nonce = 4831;
        block.hash = "000c950dc6332163444cab2a4222f9209697a41dbd773c455be709c7da40dbd2".into();
        block
    }

    fn two_tx_block() -> Block {
        let mut block = Block::next_at(
            &Block::genesis(),
            vec![
                Transaction::new("alice", "bob", 40),
                Transaction::new("bob", "carol", 25),
            ],
            1_522_983_500_000,
        )
        .unwrap();
        block.nonce = 117;
        block.hash = "000c51f230e1811f3d6cddabeb5ce4e093eaa178bd930d3034284147511f0939".into();
        block
    }

    #[test]
    fn local_transfer_scenario() {
        let mut state = LedgerState::new();
        let pending = state
            .prepare_transaction(Transaction::new("A", "B", 30))
            .unwrap();
        assert!(state.ledger().balances().is_empty());

        let committed = state.commit_mined(mine_block(pending)).unwrap().clone();
        assert_eq!(committed.previous_hash, GENESIS_HASH);
        assert_eq!(state.chain().len(), 2);
        assert_eq!(state.ledger().balance("A"), 70);
        assert_eq!(state.ledger().balance("B"), 130);
    }

    #[test]
    fn overspend_is_rejected_without_side_effects() {
        let state = LedgerState::new();
        let err = state
            .prepare_transaction(Transaction::new("A", "B", 130))
            .unwrap_err();
        assert!(matches!(
            err,
            CommitError::Ledger(LedgerError::InsufficientFunds { .. })
        ));
        assert!(state.ledger().balances().is_empty());
        assert_eq!(state.chain().len(), 1);
    }

    #[test]
    fn commit_refuses_block_built_on_old_tip() {
        let mut state = LedgerState::new();
        let first = state
            .prepare_transaction(Transaction::new("A", "B", 1))
            .unwrap();
        let second = state
            .prepare_transaction(Transaction::new("C", "D", 1))
            .unwrap();
        state.commit_mined(mine_block(first)).unwrap();
        assert!(matches!(
            state.commit_mined(mine_block(second)),
            Err(CommitError::StaleTip { .. })
        ));
        assert_eq!(state.chain().len(), 2);
        assert!(!state.ledger().contains("C"));
    }

    #[test]
    fn commit_rechecks_funds() {
        let mut state = LedgerState::new();
        let pending = state
            .prepare_transaction(Transaction::new("A", "B", 80))
            .unwrap();
        state.replace(
            Chain::new(),
            Ledger::from_balances([("A".to_string(), 10)].into_iter().collect()),
        );
        assert!(matches!(
            state.commit_mined(mine_block(pending)),
            Err(CommitError::Ledger(LedgerError::InsufficientFunds { .. }))
        ));
        assert_eq!(state.ledger().balance("A"), 10);
        assert_eq!(state.chain().len(), 1);
    }

    #[test]
    fn inbound_block_applies_first_transaction() {
        let mut state = LedgerState::new();
        state.accept_block(fixture_block()).unwrap();
        assert_eq!(state.chain().len(), 2);
        assert_eq!(state.ledger().balance("A"), 70);
        assert_eq!(state.ledger().balance("B"), 130);
    }

    #[test]
    fn inbound_block_ignores_later_transactions() {
        let mut state = LedgerState::new();
        let block = two_tx_block();
        state.accept_block(block.clone()).unwrap();

        assert_eq!(state.tip(), &block);
        assert_eq!(state.tip().data.len(), 2);
        assert_eq!(state.ledger().balance("alice"), 60);
        assert_eq!(state.ledger().balance("bob"), 140);
        // the second transfer (bob -> carol) is stored but has no effect
        assert!(!state.ledger().contains("carol"));
    }

    #[test]
    fn inbound_rejection_leaves_state_alone() {
        let mut state = LedgerState::new();
        let mut block = fixture_block();
        block.hash = "abc".into();
        assert!(matches!(
            state.accept_block(block),
            Err(Rejection::InsufficientWork(_))
        ));
        assert_eq!(state.chain().len(), 1);
        assert!(state.ledger().balances().is_empty());
    }

    #[test]
    fn first_valid_block_at_an_index_wins() {
        let mut state = LedgerState::new();
        state.accept_block(fixture_block()).unwrap();
        assert!(matches!(
            state.accept_block(two_tx_block()),
            Err(Rejection::PreviousHashMismatch { .. })
        ));
        assert_eq!(state.chain().len(), 2);
    }

    #[test]
    fn peer_block_at_last_index_cannot_wedge_local_mining() {
        let mut state = LedgerState::new();
        let mut block = Block::next(state.tip(), vec![Transaction::new("A", "B", 1)]).unwrap();
        block.index = u64::MAX;
        assert_eq!(
            state.accept_block(mine_block(block)),
            Err(Rejection::IndexOutOfRange(u64::MAX))
        );
        assert_eq!(state.chain().len(), 1);
        assert!(state
            .prepare_transaction(Transaction::new("A", "B", 1))
            .is_ok());
    }

    #[test]
    fn exhausted_tip_refuses_new_blocks() {
        // only an unverified snapshot can carry such a tip
        let mut last = Block::genesis();
        last.index = u64::MAX;
        let mut state = LedgerState::new();
        state.replace(Chain::from_blocks(vec![last]).unwrap(), Ledger::new());
        assert_eq!(
            state.prepare_transaction(Transaction::new("A", "B", 1)),
            Err(CommitError::Block(BlockError::IndexOverflow { index: u64::MAX }))
        );

        let mut wrapped = Block::next(&Block::genesis(), vec![Transaction::new("A", "B", 1)])
            .unwrap();
        wrapped.index = 0;
        assert!(matches!(
            state.commit_mined(mine_block(wrapped)),
            Err(CommitError::StaleTip { .. })
        ));
        assert_eq!(state.chain().len(), 1);
    }

    #[test]
    fn snapshot_uses_bootnode_field_names() {
        let value = serde_json::to_value(LedgerState::new()).unwrap();
        assert!(value["state"].as_object().unwrap().is_empty());
        assert_eq!(value["blocks"][0]["hash"], GENESIS_HASH);
    }
}
