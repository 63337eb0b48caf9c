//! Debounce policy
//!
//! A `Debounced<T>` publishes its first input immediately and afterwards only
//! publishes once the input has stopped changing for the configured delay.
//! Intermediate inputs inside a burst are never published.

use crate::shared::Shared;
use cadence_core::{PacingConfig, TimerId, TimerService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, trace};

/// Value-driven debounce controller
pub struct Debounced<T> {
    shared: Arc<Shared<DebounceState<T>>>,
}

struct DebounceState<T> {
    timer: Arc<dyn TimerService>,
    published: watch::Sender<T>,
    last_seen: T,
    delay: Duration,
    pending: Option<PendingPublish<T>>,
    generation: u64,
    detached: bool,
}

struct PendingPublish<T> {
    timer: TimerId,
    value: T,
}

impl<T> DebounceState<T> {
    fn take_pending(&mut self) -> Option<T> {
        let pending = self.pending.take()?;
        self.timer.cancel(pending.timer);
        self.generation += 1;
        Some(pending.value)
    }

    fn teardown(&mut self) {
        if !self.detached {
            self.detached = true;
            if self.take_pending().is_some() {
                debug!("Debounce detached with a pending publish");
            }
        }
    }
}

impl<T: PartialEq> DebounceState<T> {
    fn publish(&self, value: T) {
        self.published.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    fn fire(&mut self, generation: u64) {
        if self.detached || generation != self.generation {
            trace!("Ignoring superseded debounce timer");
            return;
        }
        if let Some(pending) = self.pending.take() {
            debug!("Debounce quiet period elapsed, publishing");
            self.publish(pending.value);
        }
    }
}

impl<T> Debounced<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Attach a debounce controller; `initial` is published immediately
    pub fn new(initial: T, delay: Duration, timer: Arc<dyn TimerService>) -> Self {
        let (published, _) = watch::channel(initial.clone());
        Self {
            shared: Shared::new(DebounceState {
                timer,
                published,
                last_seen: initial,
                delay,
                pending: None,
                generation: 0,
                detached: false,
            }),
        }
    }

    /// Attach with the debounce delay from `config`
    pub fn with_config(initial: T, config: &PacingConfig, timer: Arc<dyn TimerService>) -> Self {
        Self::new(initial, config.debounce_delay(), timer)
    }

    /// Attach with the default 500 ms delay
    pub fn with_default_delay(initial: T, timer: Arc<dyn TimerService>) -> Self {
        Self::with_config(initial, &PacingConfig::default(), timer)
    }

    /// Feed the input seen on this tick and return the published value
    ///
    /// A changed input re-arms the quiet-period timer; the returned value is
    /// still the previously published one until that timer fires.
    pub fn observe(&self, input: T) -> T {
        let mut state = self.shared.lock();
        if state.detached || state.last_seen == input {
            return state.published.borrow().clone();
        }

        state.take_pending();
        state.last_seen = input.clone();
        state.generation += 1;

        let generation = state.generation;
        let weak = Arc::downgrade(&self.shared);
        let id = state.timer.schedule(
            state.delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.lock().fire(generation);
                }
            }),
        );
        state.pending = Some(PendingPublish {
            timer: id,
            value: input,
        });
        trace!("Debounce armed {} for {:?}", id, state.delay);

        let current = state.published.borrow().clone();
        current
    }

    /// Last published value
    pub fn current(&self) -> T {
        let state = self.shared.lock();
        let current = state.published.borrow().clone();
        current
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.shared.lock().published.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    pub fn delay(&self) -> Duration {
        self.shared.lock().delay
    }

    /// Change the quiet period; an already armed timer keeps its deadline
    pub fn set_delay(&self, delay: Duration) {
        self.shared.lock().delay = delay;
    }

    /// Publish the pending value now instead of waiting out the delay
    pub fn flush(&self) -> bool {
        let mut state = self.shared.lock();
        if state.detached {
            return false;
        }
        match state.take_pending() {
            Some(value) => {
                debug!("Debounce flushed");
                state.publish(value);
                true
            }
            None => false,
        }
    }

    /// Drop the pending value without publishing it
    pub fn cancel(&self) -> bool {
        let mut state = self.shared.lock();
        if state.take_pending().is_none() {
            return false;
        }
        let published = state.published.borrow().clone();
        state.last_seen = published;
        true
    }

    /// Tear down: cancel any pending publish and ignore further input
    pub fn detach(&self) {
        self.shared.lock().teardown();
    }

    pub fn is_detached(&self) -> bool {
        self.shared.lock().detached
    }
}

impl<T> Drop for Debounced<T> {
    fn drop(&mut self) {
        self.shared.lock().teardown();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
