//! Loads [`ExchangeConfig`] from TOML and the process environment.
//!
//! Precedence, lowest first: built-in defaults, the TOML file (if one is
//! given), then `DEVTAP_*` environment variables.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::domain::config::ExchangeConfig;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parses a TOML document.  Missing fields take their defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or a field has
/// the wrong type.
pub fn parse_config(content: &str) -> Result<ExchangeConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Reads and parses the TOML file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist) and [`ConfigError::Parse`] if it is malformed.
pub fn load_config_file(path: &Path) -> Result<ExchangeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Builds the effective configuration: `path` (or defaults) with
/// environment overrides applied.
///
/// # Errors
///
/// Propagates errors from [`load_config_file`].
pub fn load_config(path: Option<&Path>) -> Result<ExchangeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            debug!("loading devtap config from {}", path.display());
            load_config_file(path)?
        }
        None => ExchangeConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}
