use std::{fmt, fs, path::Path};

use anyhow::Result;
use explorer::ConfigFile;
use serde::{Deserialize, Serialize};

/// Contents of a `blocktime` configuration file.
///
/// ```toml
/// [explorer]
/// base_url = "https://blockchain.info/"
/// timeout_secs = 30
/// max_attempts = 3
/// delays = [1, 3, 5]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlocktimeConfig {
    #[serde(default)]
    pub explorer: ConfigFile,
}

impl BlocktimeConfig {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        Self::read_string(&data)
    }

    pub fn read_string(s: &str) -> Result<Self> {
        let config = toml::from_str(s)?;
        Ok(config)
    }
}

impl fmt::Display for BlocktimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = toml::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}
