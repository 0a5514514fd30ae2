// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawConfigFile, SchedulerConfig};
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated contents.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Deserialize TOML text into a [`RawConfigFile`].
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file and validate it.
///
/// This is the recommended entry point: it reads TOML, applies defaults and
/// checks the channel capacity, the deadline and the merge declarations.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SchedulerConfig> {
    let raw_config = load_from_path(&path)?;
    SchedulerConfig::try_from(raw_config)
}

/// Default config location: `Semisync.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Semisync.toml")
}
