use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read waypoint config '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in waypoint config '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid waypoint config: {message}")]
    ValidationError { message: String },
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}

impl Config {
    /// `<config dir>/waypoint/config.toml`, or `./waypoint/config.toml` when
    /// the platform has no config directory.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("waypoint")
            .join("config.toml")
    }

    /// Load from [`config_path`](Self::config_path). No file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Config::default())
        }
    }

    /// Read, parse and validate `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Reject a zero transition timeout, an empty stack limit and a blank
    /// log filter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.navigation.transition_timeout_ms == 0 {
            return Err(invalid(
                "navigation.transition_timeout_ms must be greater than zero",
            ));
        }
        if self.navigation.max_depth == 0 {
            return Err(invalid("navigation.max_depth must be at least 1"));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(invalid("logging.filter must not be empty"));
        }
        Ok(())
    }
}
