//! Core types for the Cadence primitives
//!
//! Newtypes for the values the controllers keep across observation ticks:
//! timestamps on a time source's timeline, timer identifiers handed out by a
//! timer service, and the request epoch used to detect stale settlements.

use core::fmt;
use core::ops::{Add, Sub};
use core::time::Duration;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Millisecond timestamp on a time source's monotonic timeline
///
/// The origin is whatever the owning [`TimeSource`] chose (process start for
/// the tokio service, zero for a virtual clock). Timestamps from different
/// sources are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Add<u64> for Timestamp {
    type Output = Timestamp;

    fn add(self, other: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(other))
    }
}

impl Sub for Timestamp {
    type Output = u64;

    fn sub(self, other: Timestamp) -> u64 {
        self.0.saturating_sub(other.0)
    }
}

impl Timestamp {
    /// Origin of a timeline
    pub const ZERO: Self = Self(0);

    /// Create a new timestamp
    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Get the raw milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Get duration since another timestamp, saturating at zero
    pub fn duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}ms", self.0)
    }
}

// ----------------------------------------------------------------------------
// Timer Identifier
// ----------------------------------------------------------------------------

/// Handle for a scheduled timer, unique within the issuing timer service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Request Epoch
// ----------------------------------------------------------------------------

/// Monotonically increasing generation of an async resource's requests
///
/// Every trigger (descriptor change or manual refetch) moves the epoch forward.
/// A settlement may only touch visible state when the epoch it captured at
/// start is still the live one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Epoch(u64);

impl Epoch {
    /// Epoch of a resource that has never started a request
    pub const INITIAL: Self = Self(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The epoch that supersedes this one
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch {}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Time Source Trait
// ----------------------------------------------------------------------------

/// Trait for reading the current time of a timeline
///
/// Implementations must be monotonic: successive calls never go backwards.
pub trait TimeSource {
    /// Get the current timestamp
    fn now(&self) -> Timestamp;
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
