//! Cadence Core
//!
//! This crate provides the foundational pieces shared by the Cadence timing
//! primitives: timestamps and identifiers, the abstract timer service and its
//! tokio implementation, the async fetch source seams, configuration, and the
//! error taxonomy.
//!
//! The controllers themselves (debounce, throttle, interval, async resource)
//! live in `cadence-runtime`; this crate only defines what they consume.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod source;
pub mod timer;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{CadenceConfig, FetchConfig, IntervalConfig, PacingConfig, RetainPolicy};
pub use errors::{CadenceError, CadenceResult, FetchError, FetchErrorKind};
pub use source::{FetchSource, FnSource, RawResponse, RequestDescriptor, Transport};
pub use timer::{RepeatingCallback, TimerCallback, TimerService, TokioTimerService};
pub use types::{Epoch, TimeSource, TimerId, Timestamp};
