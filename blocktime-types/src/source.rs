use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{BlockHeight, Timestamp};

/// The most recent block at the time of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    pub height: BlockHeight,
    pub timestamp: Timestamp,
}

/// Read access to block timestamps of a chain.
///
/// Implementations are expected to return non-decreasing timestamps for
/// increasing heights. This is not checked by callers.
#[async_trait]
pub trait BlockSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Height of the current chain tip.
    async fn tip_height(&self) -> Result<BlockHeight, Self::Error>;

    /// Timestamp of the block at `height`.
    async fn timestamp(&self, height: BlockHeight) -> Result<Timestamp, Self::Error>;
}
