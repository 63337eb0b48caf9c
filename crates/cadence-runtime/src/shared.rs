//! Per-instance retained state
//!
//! Each controller owns one `Shared<S>` record that survives across
//! observation ticks and is handed weakly to every callback it schedules.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(crate) struct Shared<S> {
    state: Mutex<S>,
}

impl<S> Shared<S> {
    pub(crate) fn new(state: S) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    /// Lock the record. User callbacks never run under this lock.
    pub(crate) fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
