pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Hex prefix every accepted block hash must carry.
pub const POW_PREFIX: &str = "000";
/// How many nonces the miner tries between polls of its stop predicate.
pub const STOP_CHECK_INTERVAL: u64 = 1024;

/// Balance credited to an address the first time the ledger sees it.
pub const DEFAULT_BALANCE: i64 = 100;

pub const GENESIS_TIMESTAMP: u64 = 1_522_983_367_254;
pub const GENESIS_HASH: &str = "f7ebfb1cb6d053d9a50ec8c69edac8f3f9ca42a9f4f83bd9d38c4bc4d7d14942";
