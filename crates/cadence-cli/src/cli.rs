//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print the scenario report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Feed a timeline of inputs through a debounced value
    Debounce {
        /// Value published before any input arrives
        #[arg(short, long, default_value = "")]
        initial: String,
        /// Quiet period in milliseconds (defaults to the configured delay)
        #[arg(short, long)]
        delay_ms: Option<u64>,
        /// Inputs as GAP_MS:VALUE, applied in order
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Feed a timeline of calls through a throttled function
    Throttle {
        /// Cooldown in milliseconds (defaults to the configured delay)
        #[arg(short, long)]
        delay_ms: Option<u64>,
        /// Calls as GAP_MS:ARG, applied in order
        #[arg(required = true)]
        calls: Vec<String>,
    },
    /// Run an interval and swap its callback part way through
    Interval {
        /// Period in milliseconds (defaults to the configured period)
        #[arg(short, long)]
        period_ms: Option<u64>,
        /// Total run time in milliseconds
        #[arg(long, default_value_t = 1000)]
        run_ms: u64,
        /// Replace the callback after this many milliseconds
        #[arg(long)]
        swap_at_ms: Option<u64>,
    },
    /// Drive an async resource through a timeline of descriptors
    Fetch {
        /// Requests as GAP_MS:RESOURCE:LATENCY_MS, applied in order
        #[arg(required = true)]
        requests: Vec<String>,
        /// Resources whose requests fail at the transport level
        #[arg(long)]
        fail: Vec<String>,
        /// Trigger a manual refetch this many milliseconds after the last request
        #[arg(long)]
        refetch_after_ms: Option<u64>,
        /// Keep previous data visible while reloading
        #[arg(long)]
        keep_previous: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}
