//! Capture configuration for profiler-core
//!
//! Handles loading and validation of capture settings from TOML.
//!
//! ```toml
//! capacity = 20000
//! start_paused = false
//! indexed_fields = ["databaseName", "name"]
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, Result};
use crate::logging::{LogConfig, validate_level};

/// Upper bound on buffer capacity.
pub const MAX_CAPACITY: usize = 1_000_000;

/// Rows held when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-friendly output
    #[default]
    Pretty,
    /// JSON lines
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected one of: pretty, json")),
        }
    }
}

/// Settings for one capture session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Maximum rows held before the oldest are overwritten
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Start with ingestion paused
    #[serde(default)]
    pub start_paused: bool,

    /// Field names consumers index on; carried, not interpreted
    #[serde(default)]
    pub indexed_fields: Vec<String>,

    /// Logging settings
    #[serde(default)]
    pub logging: LogConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            start_paused: false,
            indexed_fields: Vec::new(),
            logging: LogConfig::default(),
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl CaptureConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            capacity = config.capacity,
            "capture config loaded"
        );
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()).into())
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "capacity",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.capacity > MAX_CAPACITY {
            return Err(ConfigError::Invalid {
                field: "capacity",
                reason: format!("must be at most {MAX_CAPACITY}, got {}", self.capacity),
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "logging.level",
                reason: "must not be empty".to_string(),
            });
        }
        validate_level(&self.logging.level).map_err(|e| ConfigError::Invalid {
            field: "logging.level",
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
