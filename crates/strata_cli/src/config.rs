//! Parsing of `strata.toml` configuration files.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default cache directory when neither the flag nor the config names one.
const DEFAULT_CACHE_DIR: &str = ".strata-cache";

/// Errors that can occur when loading a `strata.toml` file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Top-level configuration parsed from `strata.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct StrataConfig {
    /// Cache settings.
    #[serde(default)]
    pub cache: CacheSection,
}

/// The `[cache]` section.
#[derive(Debug, Deserialize)]
pub struct CacheSection {
    /// Directory holding the graph cache.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

/// Loads configuration from the given file.
pub fn load_config(path: &Path) -> Result<StrataConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses configuration from TOML text.
pub fn load_config_from_str(content: &str) -> Result<StrataConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}
