//! Configuration file loading for the pokerank CLI.

use pokerank_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Top-level CLI configuration.
///
/// Uses `pokerank.toml` in the current directory by default. A missing file
/// yields the defaults.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    /// SQLite database holding the session. Defaults to `data/pokerank.db`.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// JSON file listing the candidates. Defaults to `pool.json`.
    #[serde(default = "default_pool_path")]
    pub pool_path: PathBuf,
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/pokerank.db")
}

fn default_pool_path() -> PathBuf {
    PathBuf::from("pool.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            pool_path: default_pool_path(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from [`Self::config_path()`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Loads the configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default configuration file path.
    pub fn config_path() -> PathBuf {
        PathBuf::from("pokerank.toml")
    }
}
