//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment overrides. The environment lookup is injectable so callers
//! (and tests) can supply their own source.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::DEFAULT_EPOCH;
use crate::sql::Dialect;
use crate::error::TesseraError;

/// Environment variable overriding every snowflake epoch.
pub const ENV_SNOWFLAKE_EPOCH: &str = "TESSERA_SNOWFLAKE_EPOCH";
/// Environment variable pinning the snowflake datacenter id.
pub const ENV_DATACENTER_ID: &str = "TESSERA_DATACENTER_ID";
/// Environment variable pinning the snowflake worker id.
pub const ENV_WORKER_ID: &str = "TESSERA_WORKER_ID";
/// Environment variable selecting the placeholder dialect.
pub const ENV_DIALECT: &str = "TESSERA_DIALECT";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`Config`].
    #[error("failed to parse config: {source}")]
    Parse {
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
    /// An environment override did not parse.
    #[error("invalid value for {key}: {value}")]
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Raw value found.
        value: String,
    },
}

impl From<ConfigError> for TesseraError {
    fn from(err: ConfigError) -> Self {
        TesseraError::Config(err.to_string())
    }
}

/// Snowflake generator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowflakeConfig {
    /// Epoch forced on every snowflake type, ahead of per-type epochs.
    pub epoch_override: Option<i64>,
    /// Epoch used when a type declares none.
    pub default_epoch: i64,
    /// Datacenter id (0..=31); derived from the host name when unset.
    pub datacenter_id: Option<u8>,
    /// Worker id (0..=31); derived from the process id when unset.
    pub worker_id: Option<u8>,
}

impl Default for SnowflakeConfig {
    fn default() -> Self {
        Self {
            epoch_override: None,
            default_epoch: DEFAULT_EPOCH,
            datacenter_id: None,
            worker_id: None,
        }
    }
}

/// Statement synthesis settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementConfig {
    /// Placeholder style of rendered SQL.
    pub dialect: Dialect,
    /// LRU capacity for shapes that vary per call site (sorted condition queries).
    pub variable_capacity: usize,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Question,
            variable_capacity: 512,
        }
    }
}

/// Accessor resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessorConfig {
    /// LRU capacity of resolved accessor names.
    pub capacity: usize,
}

impl Default for AccessorConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Snowflake settings.
    pub snowflake: SnowflakeConfig,
    /// Statement settings.
    pub statements: StatementConfig,
    /// Accessor settings.
    pub accessors: AccessorConfig,
}

impl Config {
    /// Parses configuration from TOML text; missing keys keep their defaults.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        toml::from_str(src).map_err(|source| ConfigError::Parse { source })
    }

    /// Reads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Applies overrides from the process environment.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(epoch) = read_env(&lookup, ENV_SNOWFLAKE_EPOCH)? {
            self.snowflake.epoch_override = Some(epoch);
        }
        if let Some(id) = read_env(&lookup, ENV_DATACENTER_ID)? {
            self.snowflake.datacenter_id = Some(id);
        }
        if let Some(id) = read_env(&lookup, ENV_WORKER_ID)? {
            self.snowflake.worker_id = Some(id);
        }
        if let Some(dialect) = lookup(ENV_DIALECT).filter(|v| !v.trim().is_empty()) {
            self.statements.dialect = match dialect.trim() {
                "question" => Dialect::Question,
                "dollar" => Dialect::Dollar,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: ENV_DIALECT,
                        value: dialect,
                    })
                }
            };
        }
        Ok(self)
    }
}

fn read_env<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value: raw }),
        _ => Ok(None),
    }
}
