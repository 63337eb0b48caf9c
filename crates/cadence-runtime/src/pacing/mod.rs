//! Pacing Controller
//!
//! Two policies for deciding when a changing input may produce an effect:
//! - `Debounced`: value-driven; publishes only after a quiet period
//! - `Throttled`: call-driven; at most one invocation per window, with a
//!   trailing invocation carrying the most recent arguments

pub mod debounce;
pub mod throttle;

pub use debounce::Debounced;
pub use throttle::{CallOutcome, Throttled};
