//! Finds the block height of a point in time.
//!
//! A first guess is extrapolated from genesis or the chain tip at 144 blocks
//! per day (see [`seed_height`]); [`Locator`] then narrows it down with a
//! binary search over block timestamps fetched from a [`BlockSource`].

pub mod config;
pub mod logging;

mod estimate;
mod locate;

pub use blocktime_types::{
    BLOCKS_PER_DAY, BlockHeight, BlockSource, ChainTip, GENESIS_TIMESTAMP, SECONDS_PER_DAY,
    Timestamp,
};
pub use estimate::seed_height;
pub use locate::{Bound, Error, Located, Locator, QueryStats};
