use blocktime_types::{BLOCKS_PER_DAY, BlockHeight, ChainTip, GENESIS_TIMESTAMP, Timestamp};

/// Estimate the height of the block mined around `target`.
///
/// Extrapolates linearly at [`BLOCKS_PER_DAY`] from whichever of genesis or
/// the chain tip is fewer whole days away from `target`. The result is a
/// starting point for the search in [`crate::Locator`], not an answer, and is
/// always within `0 ..= tip.height`.
pub fn seed_height(target: Timestamp, tip: ChainTip) -> BlockHeight {
    let from_genesis = target.days_since(GENESIS_TIMESTAMP).max(0) as u64;
    let from_tip = tip.timestamp.days_since(target).max(0) as u64;
    let h = if from_genesis < from_tip {
        BlockHeight::genesis() + from_genesis.saturating_mul(BLOCKS_PER_DAY)
    } else {
        tip.height - from_tip.saturating_mul(BLOCKS_PER_DAY)
    };
    h.min(tip.height)
}
