//! Centralized Configuration Management
//!
//! Configuration structures for the pacing controllers, the interval runner,
//! and the async resource manager, consolidated under [`CadenceConfig`].

use crate::errors::{CadenceError, CadenceResult};
use core::ops::RangeInclusive;
use core::time::Duration;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Pacing Configuration
// ----------------------------------------------------------------------------

/// Default debounce quiet period
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Configuration for debounce and throttle controllers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Quiet period before a debounced value is published
    pub debounce_delay_ms: u64,
    /// Minimum spacing between throttled invocations (0 disables throttling)
    pub throttle_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            debounce_delay_ms: 500,
            throttle_delay_ms: 100,
        }
    }
}

impl PacingConfig {
    /// Short delays for interactive input such as search-as-you-type
    pub fn responsive() -> Self {
        Self {
            debounce_delay_ms: 150,
            throttle_delay_ms: 16,
        }
    }

    /// Long delays for expensive downstream work
    pub fn conservative() -> Self {
        Self {
            debounce_delay_ms: 1000,
            throttle_delay_ms: 500,
        }
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    pub fn throttle_delay(&self) -> Duration {
        Duration::from_millis(self.throttle_delay_ms)
    }
}

// ----------------------------------------------------------------------------
// Interval Configuration
// ----------------------------------------------------------------------------

/// Configuration for the interval runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Period between invocations; `None` starts the runner paused
    pub period_ms: Option<u64>,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            period_ms: Some(1000),
        }
    }
}

impl IntervalConfig {
    pub fn period(&self) -> Option<Duration> {
        self.period_ms.map(Duration::from_millis)
    }
}

// ----------------------------------------------------------------------------
// Fetch Configuration
// ----------------------------------------------------------------------------

/// What an async resource shows while a replacement request is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetainPolicy {
    /// Drop previous data as soon as a new request starts
    #[default]
    Clear,
    /// Keep showing previous data until the new request settles
    KeepPrevious,
}

/// Configuration for the async resource manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Data retention while reloading
    pub retain: RetainPolicy,
    /// Abort the superseded task in addition to discarding its result
    pub abort_superseded: bool,
    /// Lowest status code treated as success by response adapters
    pub success_status_min: u16,
    /// Highest status code treated as success by response adapters
    pub success_status_max: u16,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retain: RetainPolicy::Clear,
            abort_superseded: true,
            success_status_min: 200,
            success_status_max: 299,
        }
    }
}

impl FetchConfig {
    /// Stale-while-revalidate: previous data stays visible during reloads
    pub fn stale_while_revalidate() -> Self {
        Self {
            retain: RetainPolicy::KeepPrevious,
            ..Self::default()
        }
    }

    pub fn success_statuses(&self) -> RangeInclusive<u16> {
        self.success_status_min..=self.success_status_max
    }
}

// ----------------------------------------------------------------------------
// Top-level Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the Cadence primitives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub pacing: PacingConfig,
    pub interval: IntervalConfig,
    pub fetch: FetchConfig,
}

impl CadenceConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> CadenceResult<()> {
        if self.pacing.debounce_delay_ms == 0 {
            return Err(CadenceError::invalid_configuration(
                "pacing.debounce_delay_ms must be greater than zero",
            ));
        }

        if self.interval.period_ms == Some(0) {
            return Err(CadenceError::invalid_configuration(
                "interval.period_ms must be greater than zero when set",
            ));
        }

        if self.fetch.success_status_min > self.fetch.success_status_max {
            return Err(CadenceError::invalid_configuration(format!(
                "fetch success range is empty ({}..={})",
                self.fetch.success_status_min, self.fetch.success_status_max
            )));
        }

        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
