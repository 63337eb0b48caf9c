//! Cadence CLI Configuration Management
//!
//! Loads the controller configuration plus CLI output options from a TOML
//! file. Every section is optional and falls back to its defaults.

use std::path::Path;

use cadence_core::CadenceConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CliError, Result};

/// Complete configuration for the Cadence CLI application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Controller configuration (`[pacing]`, `[interval]`, `[fetch]`)
    #[serde(flatten)]
    pub cadence: CadenceConfig,

    /// Report output options
    pub output: OutputConfig,
}

/// How scenario reports are printed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print reports as JSON instead of a table
    pub json: bool,
    /// Extra time to keep a scenario running after its last step
    pub settle_margin_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            settle_margin_ms: 50,
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config
            .cadence
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        if config.cadence.interval.period_ms.is_none() {
            warn!("interval.period_ms is unset; the interval scenario will start paused");
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
