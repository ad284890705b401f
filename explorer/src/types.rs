use blocktime_types::{BlockHeight, Timestamp};
use serde::Deserialize;

/// Response of `GET /latestblock`.
#[derive(Debug, Deserialize)]
pub(crate) struct LatestBlock {
    pub(crate) height: BlockHeight,
}

/// Response of `GET /block-height/{height}?format=json`.
///
/// More than one block is listed when the height has seen a reorg.
#[derive(Debug, Deserialize)]
pub(crate) struct BlocksAtHeight {
    pub(crate) blocks: Vec<BlockSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlockSummary {
    pub(crate) time: Timestamp,
    #[serde(default)]
    pub(crate) main_chain: Option<bool>,
}

impl BlocksAtHeight {
    /// The main chain block, or the first one listed if none is flagged.
    pub(crate) fn main_block(&self) -> Option<&BlockSummary> {
        self.blocks
            .iter()
            .find(|b| b.main_chain == Some(true))
            .or_else(|| self.blocks.first())
    }
}
