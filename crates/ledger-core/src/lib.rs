//! Chain, ledger and proof-of-work primitives for the ledger node.
pub mod account;
pub mod block;
pub mod chain;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod peers;
pub mod pow;
pub mod state;

pub use account::{Account, AddressProvider, HmacAddressProvider};
pub use block::{Block, Transaction};
pub use chain::Chain;
pub use error::{BlockError, ChainError, CommitError, LedgerError, MineError, Rejection};
pub use ledger::Ledger;
pub use peers::{Peer, PeerRegistry};
pub use state::LedgerState;
