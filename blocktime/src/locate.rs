use std::fmt;

use blocktime_types::{
    BLOCKS_PER_DAY, BlockHeight, BlockSource, ChainTip, GENESIS_TIMESTAMP, Timestamp,
};
use tracing::{debug, info, warn};

use crate::estimate::seed_height;

/// Counters of a single `Locator::locate` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Block timestamps fetched, including the tip and the seed.
    pub lookups: usize,
    /// Timestamps fetched by the binary search.
    pub pivots: usize,
    /// Number of times the bracket had to be extended.
    pub widenings: usize,
    /// Width of the bracket the binary search started with.
    pub initial_width: u64,
}

/// Result of a successful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    /// The highest block with a timestamp at or before the target.
    pub height: BlockHeight,
    pub stats: QueryStats,
}

/// Finds the block height of a point in time.
#[derive(Debug, Clone)]
pub struct Locator<S> {
    source: S,
}

impl<S: BlockSource> Locator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Find the height `h` with `timestamp(h) <= target < timestamp(h + 1)`.
    ///
    /// `target` must lie strictly between the genesis timestamp and the
    /// timestamp of the current chain tip.
    pub async fn locate(&self, target: Timestamp) -> Result<Located, Error<S::Error>> {
        info!(%target, iso = %target.to_iso8601(), "locating block");

        if target <= GENESIS_TIMESTAMP {
            return Err(Error::InvalidRange {
                target,
                bound: Bound::Genesis,
            });
        }

        let mut lookup = Lookup::new(&self.source);

        let tip = lookup.tip().await?;

        if target >= tip.timestamp {
            return Err(Error::InvalidRange {
                target,
                bound: Bound::Tip(tip),
            });
        }

        let seed = seed_height(target, tip);
        let needle = lookup.timestamp(seed).await?;

        let days = needle.days_since(target).unsigned_abs() + 1;
        let step = days.saturating_mul(BLOCKS_PER_DAY);

        let mut bracket = if needle <= target {
            Bracket::above(seed, step, tip)
        } else {
            Bracket::below(seed, step)
        };

        lookup.stats.initial_width = bracket.width();

        debug!(
            %seed,
            %needle,
            min = %bracket.lo.height,
            max = %bracket.hi.height,
            "initial bracket"
        );

        loop {
            while bracket.width() > 1 {
                let pivot = bracket.lo.height.midpoint(bracket.hi.height);
                let ts = lookup.timestamp(pivot).await?;
                lookup.stats.pivots += 1;
                if ts > target {
                    bracket.hi = Side::verified(pivot)
                } else {
                    bracket.lo = Side::verified(pivot)
                }
            }

            if !bracket.hi.verified {
                let ts = lookup.timestamp(bracket.hi.height).await?;
                if ts <= target {
                    bracket = bracket.widen_up(tip);
                    lookup.stats.widenings += 1;
                    warn!(
                        min = %bracket.lo.height,
                        max = %bracket.hi.height,
                        "target beyond bracket, widening upwards"
                    );
                    continue;
                }
            }

            if !bracket.lo.verified {
                let ts = lookup.timestamp(bracket.lo.height).await?;
                if ts > target {
                    bracket = bracket.widen_down();
                    lookup.stats.widenings += 1;
                    warn!(
                        min = %bracket.lo.height,
                        max = %bracket.hi.height,
                        "target before bracket, widening downwards"
                    );
                    continue;
                }
            }

            break;
        }

        let height = bracket.lo.height;

        info!(
            %target,
            %height,
            lookups = %lookup.stats.lookups,
            "found block"
        );

        Ok(Located {
            height,
            stats: lookup.stats,
        })
    }
}

/// Per-query access to the block source, counting every timestamp fetch.
struct Lookup<'a, S> {
    source: &'a S,
    stats: QueryStats,
}

impl<'a, S: BlockSource> Lookup<'a, S> {
    fn new(source: &'a S) -> Self {
        Self {
            source,
            stats: QueryStats::default(),
        }
    }

    async fn tip(&mut self) -> Result<ChainTip, Error<S::Error>> {
        let height = self.source.tip_height().await.map_err(Error::Lookup)?;
        let timestamp = self.timestamp(height).await?;
        Ok(ChainTip { height, timestamp })
    }

    async fn timestamp(&mut self, height: BlockHeight) -> Result<Timestamp, Error<S::Error>> {
        self.stats.lookups += 1;
        let n = self.stats.lookups;
        let ts = self
            .source
            .timestamp(height)
            .await
            .map_err(Error::Lookup)?;
        info!(
            lookup = %n,
            %height,
            timestamp = %ts,
            "({n}) timestamp {ts} for block #{height} aka {}",
            ts.to_iso8601()
        );
        Ok(ts)
    }
}

/// One end of the search interval.
///
/// A verified side is known to satisfy the search invariant, an unverified
/// one is merely projected.
#[derive(Debug, Clone, Copy)]
struct Side {
    height: BlockHeight,
    verified: bool,
}

impl Side {
    fn verified(height: BlockHeight) -> Self {
        Self {
            height,
            verified: true,
        }
    }
}

/// Search interval with `timestamp(lo) <= target < timestamp(hi)` once
/// both sides are verified.
#[derive(Debug, Clone, Copy)]
struct Bracket {
    lo: Side,
    hi: Side,
    step: u64,
}

impl Bracket {
    /// Seed at or before the target, project `step` blocks forward.
    fn above(seed: BlockHeight, step: u64, tip: ChainTip) -> Self {
        let hi = (seed + step).min(tip.height);
        Self {
            lo: Side::verified(seed),
            hi: Side {
                height: hi,
                verified: hi == tip.height,
            },
            step,
        }
    }

    /// Seed after the target, project `step` blocks back.
    fn below(seed: BlockHeight, step: u64) -> Self {
        let lo = seed - step;
        Self {
            lo: Side {
                height: lo,
                verified: lo.is_genesis(),
            },
            hi: Side::verified(seed),
            step,
        }
    }

    /// The projected upper side turned out to be at or before the target.
    fn widen_up(self, tip: ChainTip) -> Self {
        Self::above(self.hi.height, self.step.saturating_mul(2), tip)
    }

    /// The projected lower side turned out to be after the target.
    fn widen_down(self) -> Self {
        Self::below(self.lo.height, self.step.saturating_mul(2))
    }

    fn width(&self) -> u64 {
        self.hi.height.distance_from(self.lo.height)
    }
}

/// The reference point a rejected target was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Genesis,
    Tip(ChainTip),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Genesis => write!(f, "at or before genesis ({GENESIS_TIMESTAMP})"),
            Self::Tip(t) => write!(
                f,
                "at or after chain tip #{} ({})",
                t.height, t.timestamp
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("timestamp {target} is {bound}")]
    InvalidRange { target: Timestamp, bound: Bound },

    #[error("block lookup failed: {0}")]
    Lookup(#[source] E),
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use blocktime_types::{BlockHeight, BlockSource, GENESIS_TIMESTAMP, Timestamp};
    use quickcheck::{TestResult, quickcheck};

    use super::{Bound, Error, Locator};

    /// An in-memory chain of block timestamps.
    struct Chain {
        times: Vec<Timestamp>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("no block at height {0}")]
    struct NoSuchBlock(BlockHeight);

    impl Chain {
        fn from_fn<F>(tip: u64, f: F) -> Self
        where
            F: Fn(u64) -> u64,
        {
            Self {
                times: (0..=tip)
                    .map(|h| Timestamp::from(*GENESIS_TIMESTAMP + f(h)))
                    .collect(),
            }
        }

        /// One block every 600 seconds.
        fn linear(tip: u64) -> Self {
            Self::from_fn(tip, |h| 600 * h)
        }

        fn ts(&self, h: BlockHeight) -> Timestamp {
            self.times[*h as usize]
        }

        fn tip(&self) -> Timestamp {
            *self.times.last().unwrap()
        }
    }

    #[async_trait]
    impl BlockSource for Chain {
        type Error = NoSuchBlock;

        async fn tip_height(&self) -> Result<BlockHeight, Self::Error> {
            Ok(BlockHeight::from(self.times.len() as u64 - 1))
        }

        async fn timestamp(&self, h: BlockHeight) -> Result<Timestamp, Self::Error> {
            self.times.get(*h as usize).copied().ok_or(NoSuchBlock(h))
        }
    }

    fn assert_exact(chain: &Chain, target: Timestamp, h: BlockHeight) {
        assert!(chain.ts(h) <= target, "block {h} is after {target}");
        assert!(target < chain.ts(h + 1), "block {} is not after {target}", h + 1);
    }

    fn ceil_log2(n: u64) -> usize {
        if n <= 1 {
            0
        } else {
            (u64::BITS - (n - 1).leading_zeros()) as usize
        }
    }

    #[tokio::test]
    async fn first_example_on_linear_chain() {
        let loc = Locator::new(Chain::linear(100_000));
        let target = Timestamp::from(1232103989);
        let found = loc.locate(target).await.unwrap();
        assert_eq!(*found.height, 1829);
        assert_eq!(found.stats.widenings, 0);
        assert_eq!(found.stats.initial_width, 288);
        assert!(found.stats.pivots <= ceil_log2(288));
        assert_eq!(found.stats.lookups, 2 + found.stats.pivots);
    }

    #[tokio::test]
    async fn near_tip_on_linear_chain() {
        let chain = Chain::linear(711_000);
        let target = Timestamp::from(*chain.tip() - 4 * 86_400 - 1234);
        let loc = Locator::new(chain);
        let found = loc.locate(target).await.unwrap();
        assert_exact(loc.source(), target, found.height);
        assert_eq!(found.stats.widenings, 0);
        assert!(found.stats.pivots <= ceil_log2(found.stats.initial_width));
    }

    #[tokio::test]
    async fn rejects_targets_outside_chain() {
        let loc = Locator::new(Chain::linear(1_000));
        let tip = loc.source().tip();

        for t in [0, *GENESIS_TIMESTAMP - 1, *GENESIS_TIMESTAMP] {
            let err = loc.locate(Timestamp::from(t)).await.unwrap_err();
            assert!(matches!(
                err,
                Error::InvalidRange {
                    bound: Bound::Genesis,
                    ..
                }
            ));
        }

        for t in [*tip, *tip + 1, u64::MAX] {
            let err = loc.locate(Timestamp::from(t)).await.unwrap_err();
            assert!(matches!(
                err,
                Error::InvalidRange {
                    bound: Bound::Tip(_),
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn repeated_queries_agree() {
        let loc = Locator::new(Chain::linear(50_000));
        let target = Timestamp::from(*GENESIS_TIMESTAMP + 9_876_543);
        let a = loc.locate(target).await.unwrap();
        let b = loc.locate(target).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn exact_block_timestamp_is_that_block() {
        let loc = Locator::new(Chain::linear(50_000));
        let target = Timestamp::from(*GENESIS_TIMESTAMP + 600 * 31_337);
        let found = loc.locate(target).await.unwrap();
        assert_eq!(*found.height, 31_337);
    }

    #[tokio::test]
    async fn widens_upwards_when_chain_speeds_up() {
        // 600s blocks up to 1000, then 60s blocks.
        let chain = Chain::from_fn(100_000, |h| {
            if h <= 1_000 {
                600 * h
            } else {
                600_000 + 60 * (h - 1_000)
            }
        });
        let target = Timestamp::from(*GENESIS_TIMESTAMP + 1_800_000);
        let loc = Locator::new(chain);
        let found = loc.locate(target).await.unwrap();
        assert_eq!(*found.height, 21_000);
        assert!(found.stats.widenings > 0);
    }

    #[tokio::test]
    async fn widens_downwards_when_chain_speeds_up_near_tip() {
        // 600s blocks up to 10000, then 60s blocks.
        let chain = Chain::from_fn(30_000, |h| {
            if h <= 10_000 {
                600 * h
            } else {
                6_000_000 + 60 * (h - 10_000)
            }
        });
        let target = Timestamp::from(*GENESIS_TIMESTAMP + 6_300_030);
        let loc = Locator::new(chain);
        let found = loc.locate(target).await.unwrap();
        assert_eq!(*found.height, 15_000);
        assert!(found.stats.widenings > 0);
        assert_exact(loc.source(), target, found.height);
    }

    #[tokio::test]
    async fn lookup_failure_aborts() {
        // The tip claims a height the chain does not have.
        struct Broken(Chain);

        #[async_trait]
        impl BlockSource for Broken {
            type Error = NoSuchBlock;

            async fn tip_height(&self) -> Result<BlockHeight, Self::Error> {
                Ok(BlockHeight::from(1_000_000))
            }

            async fn timestamp(&self, h: BlockHeight) -> Result<Timestamp, Self::Error> {
                self.0.timestamp(h).await
            }
        }

        let loc = Locator::new(Broken(Chain::linear(10)));
        let err = loc.locate(Timestamp::from(1232103989)).await.unwrap_err();
        assert!(matches!(err, Error::Lookup(NoSuchBlock(h)) if *h == 1_000_000));
    }

    quickcheck! {
        fn finds_exact_height(steps: Vec<u16>, pick: u64) -> TestResult {
            if steps.len() < 2 {
                return TestResult::discard()
            }
            let mut acc = 0;
            let mut offsets = vec![0];
            for s in &steps {
                acc += u64::from(*s);
                offsets.push(acc);
            }
            if acc < 2 {
                return TestResult::discard()
            }
            let chain = Chain::from_fn(steps.len() as u64, |h| offsets[h as usize]);
            let target = Timestamp::from(*GENESIS_TIMESTAMP + 1 + pick % (acc - 1));

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let loc = Locator::new(chain);
            let found = rt.block_on(loc.locate(target)).unwrap();

            let chain = loc.source();
            let h = found.height;
            TestResult::from_bool(chain.ts(h) <= target && target < chain.ts(h + 1))
        }

        fn linear_chain_needs_no_widening(pick: u64) -> bool {
            let chain = Chain::linear(20_000);
            let span = *chain.tip() - *GENESIS_TIMESTAMP;
            let target = Timestamp::from(*GENESIS_TIMESTAMP + 1 + pick % (span - 1));

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let loc = Locator::new(chain);
            let found = rt.block_on(loc.locate(target)).unwrap();

            *found.height == (*target - *GENESIS_TIMESTAMP) / 600
                && found.stats.widenings == 0
                && found.stats.pivots <= ceil_log2(found.stats.initial_width)
        }
    }
}
