use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("malformed block: {0}")]
    Malformed(String),

    #[error("block hash mismatch: stored {stored}, recomputed {recomputed}")]
    HashMismatch { stored: String, recomputed: String },

    #[error("block index {index} has no successor")]
    IndexOverflow { index: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Not enough money: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: u64 },

    #[error("amount {0} does not fit in a balance")]
    AmountOverflow(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MineError {
    #[error("mining interrupted after {attempts} attempts")]
    Interrupted { attempts: u64 },
}

/// Why an inbound block was refused. Variants are listed in the order the
/// checks run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("hash {0} does not meet the proof-of-work target")]
    InsufficientWork(String),

    #[error("previous hash {got} does not match tip {tip}")]
    PreviousHashMismatch { tip: String, got: String },

    #[error("index {got} is not above tip index {tip}")]
    StaleIndex { tip: u64, got: u64 },

    #[error("index {0} leaves no room for a successor")]
    IndexOutOfRange(u64),

    #[error(transparent)]
    Integrity(#[from] BlockError),

    #[error("block carries no transactions")]
    EmptyData,
}

/// Why a local transaction could not be turned into a block or committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("chain tip moved to {tip} while mining on {parent}")]
    StaleTip { tip: String, parent: String },

    #[error("block carries no transactions")]
    EmptyData,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Block(#[from] BlockError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain must contain at least the genesis block")]
    Empty,

    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: u64 },

    #[error("genesis block differs from the built-in genesis")]
    ForeignGenesis,

    #[error(transparent)]
    Block(#[from] BlockError),
}
