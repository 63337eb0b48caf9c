//! Interval Runner
//!
//! Invokes the most recently registered callback on a fixed period. The
//! callback lives in a cell that is read at fire time, so replacing it never
//! disturbs the timer phase. Only a period change re-arms the timer.

use crate::shared::Shared;
use cadence_core::{CadenceError, CadenceResult, IntervalConfig, TimerId, TimerService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Periodic invoker of the latest callback
pub struct IntervalRunner {
    shared: Arc<Shared<IntervalState>>,
}

struct IntervalState {
    timer: Arc<dyn TimerService>,
    callback: Callback,
    period: Option<Duration>,
    active: Option<TimerId>,
    generation: u64,
    fire_count: u64,
    detached: bool,
}

impl IntervalState {
    fn disarm(&mut self) {
        if let Some(id) = self.active.take() {
            self.timer.cancel(id);
            self.generation += 1;
            debug!("Interval {} torn down", id);
        }
    }

    fn tick(&mut self, generation: u64) -> Option<Callback> {
        if self.detached || generation != self.generation {
            trace!("Ignoring tick from a replaced interval");
            return None;
        }
        self.fire_count += 1;
        Some(Arc::clone(&self.callback))
    }
}

fn check_period(period: Option<Duration>) -> CadenceResult<()> {
    match period {
        Some(period) if period.is_zero() => Err(CadenceError::invalid_configuration(
            "interval period must be greater than zero",
        )),
        _ => Ok(()),
    }
}

impl IntervalRunner {
    /// Attach a runner; `None` starts it paused
    pub fn new(
        callback: impl Fn() + Send + Sync + 'static,
        period: Option<Duration>,
        timer: Arc<dyn TimerService>,
    ) -> CadenceResult<Self> {
        check_period(period)?;
        let runner = Self {
            shared: Shared::new(IntervalState {
                timer,
                callback: Arc::new(callback),
                period: None,
                active: None,
                generation: 0,
                fire_count: 0,
                detached: false,
            }),
        };
        runner.set_period(period)?;
        Ok(runner)
    }

    /// Attach with the period from `config`
    pub fn with_config(
        callback: impl Fn() + Send + Sync + 'static,
        config: &IntervalConfig,
        timer: Arc<dyn TimerService>,
    ) -> CadenceResult<Self> {
        Self::new(callback, config.period(), timer)
    }

    /// Feed this tick's callback and period
    pub fn observe(
        &self,
        callback: impl Fn() + Send + Sync + 'static,
        period: Option<Duration>,
    ) -> CadenceResult<()> {
        check_period(period)?;
        self.set_callback(callback);
        self.set_period(period)
    }

    /// Replace the callback without touching the timer
    pub fn set_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        let mut state = self.shared.lock();
        if !state.detached {
            state.callback = Arc::new(callback);
        }
    }

    /// Change the period; the same period keeps the current phase
    ///
    /// Ignored once detached, like every other setter.
    pub fn set_period(&self, period: Option<Duration>) -> CadenceResult<()> {
        check_period(period)?;
        let mut state = self.shared.lock();
        if state.detached {
            trace!("Ignoring period change on a detached interval");
            return Ok(());
        }
        if state.period == period && (period.is_none() || state.active.is_some()) {
            return Ok(());
        }

        state.disarm();
        state.period = period;
        let Some(period) = period else {
            return Ok(());
        };

        state.generation += 1;
        let generation = state.generation;
        let weak = Arc::downgrade(&self.shared);
        let id = state.timer.schedule_repeating(
            period,
            Box::new(move || {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let callback = shared.lock().tick(generation);
                if let Some(callback) = callback {
                    callback();
                }
            }),
        );
        state.active = Some(id);
        debug!("Interval {} armed every {:?}", id, period);
        Ok(())
    }

    /// Stop invoking until a period is set again
    pub fn pause(&self) {
        let mut state = self.shared.lock();
        state.disarm();
        state.period = None;
    }

    pub fn period(&self) -> Option<Duration> {
        self.shared.lock().period
    }

    pub fn is_active(&self) -> bool {
        self.shared.lock().active.is_some()
    }

    /// Number of callback invocations so far
    pub fn fire_count(&self) -> u64 {
        self.shared.lock().fire_count
    }

    /// Tear down the timer unconditionally
    pub fn detach(&self) {
        let mut state = self.shared.lock();
        state.disarm();
        state.detached = true;
    }

    pub fn is_detached(&self) -> bool {
        self.shared.lock().detached
    }
}

impl Drop for IntervalRunner {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.disarm();
        state.detached = true;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
