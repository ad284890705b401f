mod config;
mod types;

use async_trait::async_trait;
use blocktime_types::{BlockHeight, BlockSource, Timestamp};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json as json;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::types::{BlocksAtHeight, LatestBlock};

pub use config::{Config, ConfigBuilder, ConfigFile, DEFAULT_BASE_URL};

static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A client for a blockchain.info style block explorer.
#[derive(Debug, Clone)]
pub struct Client {
    config: Config,
    client: reqwest::Client,
}

impl Client {
    pub fn new(c: Config) -> Result<Self, Error> {
        let r = reqwest::Client::builder()
            .https_only(c.https_only)
            .timeout(c.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Client)?;
        Ok(Self {
            config: c,
            client: r,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Height of the latest block.
    pub async fn latest_height(&self) -> Result<BlockHeight, Error> {
        let u = self.config.base_url.join("latestblock")?;
        let b: LatestBlock = self.get_with_retry(u).await?;
        Ok(b.height)
    }

    /// Timestamp of the main chain block at the given height.
    pub async fn block_time<H>(&self, height: H) -> Result<Timestamp, Error>
    where
        H: Into<BlockHeight>,
    {
        let h = height.into();
        let mut u = self.config.base_url.join(&format!("block-height/{h}"))?;
        u.query_pairs_mut().append_pair("format", "json");
        let b: BlocksAtHeight = self.get_with_retry(u).await?;
        b.main_block()
            .map(|b| b.time)
            .ok_or(Error::NoBlocks(h))
    }

    async fn get_with_retry<A>(&self, url: Url) -> Result<A, Error>
    where
        A: DeserializeOwned,
    {
        let max = self.config.max_attempts();
        let mut delay = self.config.delay_iter();
        let mut attempt = 1;
        loop {
            match self.get(url.clone()).await {
                Ok(a) => return Ok(a),
                Err(RequestError::Json(err)) => {
                    warn!(node = %self.config.label, %url, %err, "malformed response");
                    return Err(Error::Json(err));
                }
                Err(err) if attempt >= max => {
                    warn!(node = %self.config.label, %url, %err, %attempt, "giving up");
                    return Err(Error::Exhausted {
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    warn!(node = %self.config.label, %url, %err, %attempt, "failed to get response");
                    if let Some(d) = delay.next() {
                        sleep(d).await
                    }
                    attempt += 1
                }
            }
        }
    }

    async fn get<A>(&self, url: Url) -> Result<A, RequestError>
    where
        A: DeserializeOwned,
    {
        debug!(node = %self.config.label, %url, "get");

        let res = self.client.get(url).send().await?;

        if !res.status().is_success() {
            return Err(RequestError::Status(res.status()));
        }

        let bytes = res.bytes().await?;

        Ok(json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl BlockSource for Client {
    type Error = Error;

    async fn tip_height(&self) -> Result<BlockHeight, Self::Error> {
        self.latest_height().await
    }

    async fn timestamp(&self, height: BlockHeight) -> Result<Timestamp, Self::Error> {
        self.block_time(height).await
    }
}

/// Errors `Client` can not recover from.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] json::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("no block at height {0}")]
    NoBlocks(BlockHeight),

    #[error("request failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u8,
        #[source]
        source: RequestError,
    },
}

/// Transient errors of a single request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("json error: {0}")]
    Json(#[from] json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api status: {0}")]
    Status(StatusCode),
}
