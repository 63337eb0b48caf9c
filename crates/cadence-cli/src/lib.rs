//! Cadence CLI library
//!
//! Scripted scenarios that drive each Cadence controller on the tokio timer
//! service and report what a consumer would have observed.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod report;
pub mod scenario;

pub use cli::{Cli, Commands};
pub use config::AppConfig;
pub use error::{CliError, Result};
