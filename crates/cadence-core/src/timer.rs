//! Timer Service
//!
//! The abstract timer the pacing controllers and the interval runner are
//! built on, plus a tokio-backed implementation.
//!
//! Cancellation is cooperative: a timer whose callback has already been
//! claimed can no longer be cancelled, so controllers re-check their own
//! generation counter inside every callback.

use crate::errors::{CadenceError, CadenceResult};
use crate::types::{TimeSource, TimerId, Timestamp};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Callback run once when a timer fires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Callback run on every period of a repeating timer
pub type RepeatingCallback = Box<dyn FnMut() + Send + 'static>;

/// Shortest period a repeating timer will run at
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

// ----------------------------------------------------------------------------
// Timer Service Trait
// ----------------------------------------------------------------------------

/// Schedules and cancels deferred callbacks on a timeline
pub trait TimerService: TimeSource + Send + Sync {
    /// Run `callback` once after `delay`
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerId;

    /// Run `callback` every `period`, first firing one period from now
    fn schedule_repeating(&self, period: Duration, callback: RepeatingCallback) -> TimerId;

    /// Cancel a timer; returns false if it already fired or was never issued
    fn cancel(&self, id: TimerId) -> bool;
}

// ----------------------------------------------------------------------------
// Tokio Timer Service
// ----------------------------------------------------------------------------

/// Timer service backed by tokio tasks
///
/// Every timer is a spawned task sleeping on `tokio::time`, so paused test
/// time (`start_paused = true`) drives it deterministically. The registry
/// decides the race between firing and cancelling: whichever side removes
/// the entry first wins.
pub struct TokioTimerService {
    handle: Handle,
    origin: Instant,
    next_id: AtomicU64,
    timers: Arc<DashMap<TimerId, Option<AbortHandle>>>,
}

impl TokioTimerService {
    /// Create a service on the current tokio runtime
    pub fn new() -> CadenceResult<Self> {
        let handle = Handle::try_current().map_err(|e| CadenceError::RuntimeUnavailable {
            reason: e.to_string(),
        })?;
        Ok(Self::with_handle(handle))
    }

    /// Create a service that spawns onto the given runtime
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            origin: Instant::now(),
            next_id: AtomicU64::new(1),
            timers: Arc::new(DashMap::new()),
        }
    }

    /// Number of timers scheduled and not yet fired or cancelled
    ///
    /// Repeating timers count until cancelled.
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    fn allocate_id(&self) -> TimerId {
        TimerId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn attach_abort_handle(&self, id: TimerId, abort: AbortHandle) {
        match self.timers.get_mut(&id) {
            Some(mut entry) => *entry = Some(abort),
            // Already fired or cancelled before the handle was recorded.
            None => abort.abort(),
        }
    }
}

impl TimeSource for TokioTimerService {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.origin.elapsed().as_millis() as u64)
    }
}

impl TimerService for TokioTimerService {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let id = self.allocate_id();
        self.timers.insert(id, None);

        let timers = Arc::clone(&self.timers);
        let task = self.handle.spawn(async move {
            sleep(delay).await;
            if timers.remove(&id).is_some() {
                trace!("{} fired", id);
                callback();
            }
        });
        self.attach_abort_handle(id, task.abort_handle());

        debug!("Scheduled {} in {:?}", id, delay);
        id
    }

    fn schedule_repeating(&self, period: Duration, mut callback: RepeatingCallback) -> TimerId {
        let id = self.allocate_id();
        self.timers.insert(id, None);

        let period = period.max(MIN_PERIOD);
        let timers = Arc::clone(&self.timers);
        let task = self.handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !timers.contains_key(&id) {
                    break;
                }
                trace!("{} ticked", id);
                callback();
            }
        });
        self.attach_abort_handle(id, task.abort_handle());

        debug!("Scheduled repeating {} every {:?}", id, period);
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some((_, abort)) => {
                if let Some(abort) = abort {
                    abort.abort();
                }
                debug!("Cancelled {}", id);
                true
            }
            None => false,
        }
    }
}

impl Drop for TokioTimerService {
    fn drop(&mut self) {
        for entry in self.timers.iter() {
            if let Some(abort) = entry.value() {
                abort.abort();
            }
        }
        self.timers.clear();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
