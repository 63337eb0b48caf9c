//! Async Fetch Lifecycle Manager
//!
//! `AsyncResource` owns one outstanding operation per request descriptor and
//! exposes its lifecycle as a `FetchSnapshot`. `JsonSource` adapts a raw
//! transport into a decoding source.

pub mod json;
pub mod resource;
pub mod state;

pub use json::JsonSource;
pub use resource::AsyncResource;
pub use state::{FetchSnapshot, FetchState};
