use std::{iter::repeat, time::Duration};

use bon::Builder;
use serde::{Deserialize, Serialize};
use url::{ParseError, Url};

const NUM_DELAYS: usize = 3;

pub const DEFAULT_BASE_URL: &str = "https://blockchain.info/";

#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Log label.
    #[builder(into, default = "explorer".to_string())]
    pub(crate) label: String,

    /// Block explorer base URL.
    #[builder(with = |s: &str| -> Result<_, ParseError> { Url::parse(s) })]
    pub(crate) base_url: Url,

    /// Only talk to the explorer over https?
    #[builder(default = true)]
    pub(crate) https_only: bool,

    /// Timeout of a single request.
    #[builder(default = Duration::from_secs(30))]
    pub(crate) timeout: Duration,

    /// Number of attempts per request before giving up.
    #[builder(default = 3)]
    pub(crate) max_attempts: u8,

    /// The sequence of delays between successive attempts.
    ///
    /// The last value is repeated forever.
    #[builder(default = [1, 3, 5])]
    pub(crate) delays: [u8; NUM_DELAYS],
}

impl Config {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts.max(1)
    }

    pub fn delay_iter(&self) -> impl Iterator<Item = Duration> + use<> {
        self.delays
            .into_iter()
            .chain(repeat(self.delays[NUM_DELAYS - 1]))
            .map(|n| Duration::from_secs(n.into()))
    }
}

/// Explorer settings as read from a configuration file.
///
/// Every field is optional; missing values fall back to the builder defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delays: Option<[u8; NUM_DELAYS]>,
}

impl ConfigFile {
    /// Build a `Config`, letting `base_url` override the file value.
    pub fn into_config(self, label: &str, base_url: Option<Url>) -> Result<Config, ParseError> {
        let url = base_url
            .or(self.base_url)
            .map(String::from)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let cfg = Config::builder()
            .label(label)
            .base_url(&url)?
            .maybe_https_only(self.https_only)
            .maybe_timeout(self.timeout_secs.map(Duration::from_secs))
            .maybe_max_attempts(self.max_attempts)
            .maybe_delays(self.delays)
            .build();
        Ok(cfg)
    }
}
