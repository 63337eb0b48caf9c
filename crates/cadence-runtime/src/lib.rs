//! Cadence Runtime
//!
//! The controllers that attach to a host's update cycle:
//! - `Debounced`: publishes the latest input only after a quiet period
//! - `Throttled`: rate-limits invocations with a trailing, latest-args call
//! - `IntervalRunner`: invokes the latest callback on a fixed period
//! - `AsyncResource`: one epoch-gated async operation per request descriptor
//!
//! Every controller keeps its retained state in one shared record, re-checks
//! a generation counter inside each deferred callback, and stops mutating
//! anything once detached (explicitly or on drop).

pub mod fetch;
pub mod interval;
pub mod pacing;
mod shared;

pub use fetch::{AsyncResource, FetchSnapshot, FetchState, JsonSource};
pub use interval::IntervalRunner;
pub use pacing::{CallOutcome, Debounced, Throttled};

// Re-export core types for convenience
pub use cadence_core::{
    CadenceConfig, CadenceError, CadenceResult, Epoch, FetchConfig, FetchError, FetchErrorKind,
    FetchSource, FnSource, IntervalConfig, PacingConfig, RawResponse, RequestDescriptor,
    RetainPolicy, TimeSource, TimerService, Timestamp, TokioTimerService, Transport,
};
