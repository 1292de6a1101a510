//! Configuration management and validation.
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! environment variables, then command-line overrides applied by the caller.

use crate::constants::{
    DEFAULT_CONFIG_FILE_NAME, DEFAULT_LOG_LEVEL, DEFAULT_SNAPSHOT_DIR_NAME, ENV_LOG_LEVEL,
    ENV_SNAPSHOT_DIR, LOG_LEVELS,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Runtime configuration for the memdb command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the CSV snapshot
    pub snapshot_dir: PathBuf,

    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,

    /// Reject snapshot rows with dangling references instead of skipping them
    pub strict_load: bool,
}

impl Default for Config {
    fn default() -> Self {
        let snapshot_dir = dirs::data_dir()
            .map(|dir| dir.join(DEFAULT_SNAPSHOT_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR_NAME));
        Self {
            snapshot_dir,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            strict_load: false,
        }
    }
}

impl Config {
    /// Location of the configuration file under the user config directory
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE_NAME))
    }

    /// Read a JSON configuration file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::io(format!("Failed to read config file {}", path.display()), e)
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Defaults, then `file` (or the default config file if it exists), then
    /// the process environment
    ///
    /// An explicitly named file must exist.
    pub fn load_layered(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path().filter(|path| path.exists()) {
                Some(path) => {
                    debug!("Using config file {}", path.display());
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_SNAPSHOT_DIR).filter(|d| !d.is_empty()) {
            debug!("{} overrides snapshot directory", ENV_SNAPSHOT_DIR);
            self.snapshot_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|l| !l.is_empty()) {
            self.log_level = level.to_lowercase();
        }
    }

    /// Set the snapshot directory
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    /// Set the log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable strict snapshot loading
    pub fn with_strict_load(mut self, strict: bool) -> Self {
        self.strict_load = strict;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.snapshot_dir.as_os_str().is_empty() {
            return Err(Error::configuration("Snapshot directory must not be empty"));
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::configuration(format!(
                "Invalid log level '{}', expected one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}
