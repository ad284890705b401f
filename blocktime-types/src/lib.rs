mod height;
mod source;
mod time;

pub use height::BlockHeight;
pub use source::{BlockSource, ChainTip};
pub use time::{ParseTimestampError, Timestamp};

/// Timestamp of the bitcoin genesis block.
pub const GENESIS_TIMESTAMP: Timestamp = Timestamp::from_secs(1231006505);

/// Expected number of blocks per day (one block every 10 minutes).
pub const BLOCKS_PER_DAY: u64 = 6 * 24;

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
