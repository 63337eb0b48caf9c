//! Error handling for the Cadence CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cadence error: {0}")]
    Cadence(#[from] cadence_core::CadenceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid scenario step '{step}': {reason}")]
    Scenario { step: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),
}

impl CliError {
    pub fn scenario(step: &str, reason: impl Into<String>) -> Self {
        CliError::Scenario {
            step: step.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
