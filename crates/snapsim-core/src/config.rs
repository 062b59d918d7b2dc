//! Configuration management for snapsim
//!
//! Handles loading and validation of `snapsim.toml`. Every field has a
//! default, so an absent file behaves like an empty one; command-line flags
//! are layered on top by the CLI.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::logging::{LogConfig, LogLevel};
use crate::retention_spec::RetentionSpec;
use crate::snapshot_dates::{DEFAULT_DATE_FORMAT, validate_format};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SNAPSIM_CONFIG";

const CONFIG_DIR_NAME: &str = "snapsim";
const CONFIG_FILE_NAME: &str = "snapsim.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Simulation defaults
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LogConfig,
}

/// Simulation defaults; each one can be overridden on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// strftime pattern of snapshot names
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Retention specification, e.g. `hour:24,day:7`
    #[serde(default)]
    pub retention: Option<RetentionSpec>,

    /// Seconds to advance per run
    #[serde(default)]
    pub interval_secs: Option<u64>,

    #[serde(default)]
    pub keep_latest: bool,

    #[serde(default)]
    pub keep_younger: bool,

    /// Create a snapshot at each new "now"
    #[serde(default)]
    pub create: bool,

    /// Wait for Enter between runs
    #[serde(default)]
    pub prompt: bool,

    /// Stop after this many runs
    #[serde(default)]
    pub max_runs: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            retention: None,
            interval_secs: None,
            keep_latest: false,
            keep_younger: false,
            create: false,
            prompt: false,
            max_runs: None,
        }
    }
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
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

impl Config {
    /// Default config location: `<config_dir>/snapsim/snapsim.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `explicit` if given, else from the default location if a
    /// file exists there, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_format(&self.simulation.date_format)?;
        if self.simulation.interval_secs == Some(0) {
            return Err(
                ConfigError::ValidationError("simulation.interval_secs must be > 0".into()).into(),
            );
        }
        if self.simulation.max_runs == Some(0) {
            return Err(
                ConfigError::ValidationError("simulation.max_runs must be > 0".into()).into(),
            );
        }
        self.logging
            .level
            .parse::<LogLevel>()
            .map_err(ConfigError::ValidationError)?;
        Ok(())
    }
}
