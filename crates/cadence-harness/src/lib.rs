#![doc = "Cadence Harness\n\nDeterministic stand-ins for the timer service and the async operation\nsources, used by the runtime tests and the demo binary."]

pub mod mock_source;
pub mod virtual_timer;

pub use mock_source::{MockSource, MockSourceStats, MockTransport, Scripted};
pub use virtual_timer::VirtualTimer;
