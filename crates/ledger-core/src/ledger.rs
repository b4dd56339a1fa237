use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::block::Transaction;
use crate::constants::DEFAULT_BALANCE;
use crate::error::LedgerError;

/// Address to balance mapping. Addresses are credited [`DEFAULT_BALANCE`] the
/// first time a transfer touches them, not when an account is created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    balances: BTreeMap<String, i64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_balances(balances: BTreeMap<String, i64>) -> Self {
        Self { balances }
    }

    pub fn balances(&self) -> &BTreeMap<String, i64> {
        &self.balances
    }

    pub fn contains(&self, address: &str) -> bool {
        self.balances.contains_key(address)
    }

    /// Balance an address would have after [`Ledger::credit_if_unseen`],
    /// without recording it.
    pub fn balance(&self, address: &str) -> i64 {
        self.balances
            .get(address)
            .copied()
            .unwrap_or(DEFAULT_BALANCE)
    }

    pub fn credit_if_unseen(&mut self, address: &str) -> i64 {
        *self
            .balances
            .entry(address.to_string())
            .or_insert(DEFAULT_BALANCE)
    }

    pub fn ensure_funds(&self, from: &str, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balance(from);
        let requested = to_balance(amount)?;
        if requested > balance {
            return Err(LedgerError::InsufficientFunds {
                balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Moves `amount` between two addresses, crediting either one first if it
    /// has never been seen. Leaves the ledger untouched on failure.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<(), LedgerError> {
        self.ensure_funds(from, amount)?;
        self.apply_unchecked(&Transaction::new(from, to, amount))
    }

    /// Applies a transfer without a funds check; balances may go negative.
    /// Used for blocks mined elsewhere, which the ledger takes on trust.
    pub fn apply_unchecked(&mut self, tx: &Transaction) -> Result<(), LedgerError> {
        let amount = to_balance(tx.amount)?;
        self.credit_if_unseen(&tx.from_address);
        self.credit_if_unseen(&tx.to_address);
        if let Some(balance) = self.balances.get_mut(&tx.from_address) {
            *balance = balance.saturating_sub(amount);
        }
        if let Some(balance) = self.balances.get_mut(&tx.to_address) {
            *balance = balance.saturating_add(amount);
        }
        Ok(())
    }
}

fn to_balance(amount: u64) -> Result<i64, LedgerError> {
    i64::try_from(amount).map_err(|_| LedgerError::AmountOverflow(amount))
}
