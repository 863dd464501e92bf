//! Configuration for try.
//!
//! Settings are read from an optional `~/.try/config.toml`:
//!
//! ```toml
//! # Tries directory (default: ~/src/tries)
//! path = "~/code/tries"
//!
//! # Set to false to disable ANSI colors
//! colors = true
//!
//! [input]
//! # How long to wait after ESC for an arrow-key sequence
//! escape_timeout_ms = 50
//!
//! [log]
//! # tracing filter directive, overridden by TRY_LOG
//! level = "debug"
//! ```
//!
//! Every field is optional. A missing file means defaults; a malformed file
//! is reported and also falls back to defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workspace;

/// Tries directory when neither the command line nor the config names one
pub const DEFAULT_TRIES_PATH: &str = "~/src/tries";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tries directory (`~` is expanded)
    pub path: Option<String>,
    /// Colored output
    pub colors: bool,
    pub input: InputConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            colors: true,
            input: InputConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Key input settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub escape_timeout_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { escape_timeout_ms: 50 }
    }
}

/// Log settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: Option<String>,
}

impl Config {
    /// Load `~/.try/config.toml`, with defaults if it does not exist
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load a specific file, with defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `~/.try`, home of the config and log files
    pub fn data_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".try"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::data_dir().map(|dir| dir.join("config.toml"))
    }

    /// Tries directory: command line, then config, then the default
    pub fn tries_path(&self, cli: Option<&str>) -> PathBuf {
        let raw = cli
            .or(self.path.as_deref())
            .unwrap_or(DEFAULT_TRIES_PATH);
        workspace::expand_home(raw)
    }

    pub fn escape_timeout(&self) -> Duration {
        Duration::from_millis(self.input.escape_timeout_ms)
    }
}

/// The user's home directory
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}
