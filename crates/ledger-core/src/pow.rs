use crate::block::Block;
use crate::constants::{POW_PREFIX, STOP_CHECK_INTERVAL};
use crate::error::MineError;

pub fn meets_target(hash: &str) -> bool {
    hash.starts_with(POW_PREFIX)
}

/// Increments the nonce from its current value until the block hash carries
/// [`POW_PREFIX`]. `stop` is polled every [`STOP_CHECK_INTERVAL`] attempts;
/// once it returns `true` the search gives up and the block keeps whatever
/// nonce it reached. Returns the number of hashes computed.
pub fn mine(block: &mut Block, mut stop: impl FnMut() -> bool) -> Result<u64, MineError> {
    let mut attempts = 0u64;
    loop {
        block.hash = block.calculate_hash();
        attempts += 1;
        if meets_target(&block.hash) {
            return Ok(attempts);
        }
        if attempts % STOP_CHECK_INTERVAL == 0 && stop() {
            return Err(MineError::Interrupted { attempts });
        }
        block.nonce = block.nonce.wrapping_add(1);
    }
}

/// Mine without a stop condition.
pub fn mine_block(mut block: Block) -> Block {
    // never interrupted
    let _ = mine(&mut block, || false);
    block
}
