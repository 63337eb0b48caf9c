//! Throttle policy
//!
//! A `Throttled<A>` wraps a target function. The first call in a window runs
//! the target synchronously; calls inside the cooldown collapse into a single
//! trailing invocation that runs when the cooldown ends, with the arguments
//! of the most recent call.

use crate::shared::Shared;
use cadence_core::{PacingConfig, TimerId, TimerService, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

type Target<A> = Arc<dyn Fn(A) + Send + Sync>;

/// What a throttled call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The target ran synchronously inside the call
    Invoked,
    /// A trailing invocation was armed to run after the given delay
    Scheduled { after: Duration },
    /// A trailing invocation was already armed; its arguments were replaced
    Coalesced,
    /// The throttler is detached; nothing happened
    Ignored,
}

/// Call-driven throttle controller
pub struct Throttled<A> {
    shared: Arc<Shared<ThrottleState<A>>>,
}

struct ThrottleState<A> {
    timer: Arc<dyn TimerService>,
    target: Target<A>,
    delay: Duration,
    last_fire: Option<Timestamp>,
    pending: Option<TimerId>,
    latest_args: Option<A>,
    generation: u64,
    invocations: u64,
    detached: bool,
}

impl<A> ThrottleState<A> {
    fn clear_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(id) => {
                self.timer.cancel(id);
                self.latest_args = None;
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        self.clear_pending();
        self.last_fire = None;
    }

    fn teardown(&mut self) {
        if !self.detached {
            self.detached = true;
            if self.clear_pending() {
                debug!("Throttle detached, trailing call dropped");
            }
        }
    }

    fn fire_trailing(&mut self, generation: u64) -> Option<(Target<A>, A)> {
        if self.detached || generation != self.generation {
            trace!("Ignoring superseded trailing call");
            return None;
        }
        self.pending = None;
        let args = self.latest_args.take()?;
        self.last_fire = Some(self.timer.now());
        self.invocations += 1;
        Some((Arc::clone(&self.target), args))
    }
}

impl<A> Throttled<A>
where
    A: Send + 'static,
{
    /// Wrap `target` so it runs at most once per `delay`
    ///
    /// A zero delay disables throttling.
    pub fn new(
        target: impl Fn(A) + Send + Sync + 'static,
        delay: Duration,
        timer: Arc<dyn TimerService>,
    ) -> Self {
        Self {
            shared: Shared::new(ThrottleState {
                timer,
                target: Arc::new(target),
                delay,
                last_fire: None,
                pending: None,
                latest_args: None,
                generation: 0,
                invocations: 0,
                detached: false,
            }),
        }
    }

    /// Wrap `target` with the throttle delay from `config`
    pub fn with_config(
        target: impl Fn(A) + Send + Sync + 'static,
        config: &PacingConfig,
        timer: Arc<dyn TimerService>,
    ) -> Self {
        Self::new(target, config.throttle_delay(), timer)
    }

    /// Call the throttled function
    pub fn call(&self, args: A) -> CallOutcome {
        let mut state = self.shared.lock();
        if state.detached {
            return CallOutcome::Ignored;
        }

        let now = state.timer.now();
        let elapsed = state.last_fire.map(|last| now.duration_since(last));
        let ready = state.delay.is_zero() || elapsed.map_or(true, |e| e >= state.delay);

        if ready {
            if state.clear_pending() {
                trace!("Leading call supersedes armed trailing call");
            }
            state.last_fire = Some(now);
            state.invocations += 1;
            let target = Arc::clone(&state.target);
            drop(state);

            target(args);
            return CallOutcome::Invoked;
        }

        state.latest_args = Some(args);
        if state.pending.is_some() {
            return CallOutcome::Coalesced;
        }

        let remaining = state.delay.saturating_sub(elapsed.unwrap_or_default());
        state.generation += 1;
        let generation = state.generation;
        let weak = Arc::downgrade(&self.shared);
        let id = state.timer.schedule(
            remaining,
            Box::new(move || {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let trailing = shared.lock().fire_trailing(generation);
                if let Some((target, args)) = trailing {
                    target(args);
                }
            }),
        );
        state.pending = Some(id);
        trace!("Throttle armed trailing {} in {:?}", id, remaining);

        CallOutcome::Scheduled { after: remaining }
    }

    pub fn delay(&self) -> Duration {
        self.shared.lock().delay
    }

    /// Change the delay; a different value starts a fresh throttler
    pub fn set_delay(&self, delay: Duration) {
        let mut state = self.shared.lock();
        if state.delay != delay {
            state.reset();
            state.delay = delay;
        }
    }

    /// Forget the last invocation and drop any trailing call
    pub fn reset(&self) {
        self.shared.lock().reset();
    }

    pub fn has_pending(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    /// Number of times the target has run
    pub fn invocations(&self) -> u64 {
        self.shared.lock().invocations
    }

    /// Tear down: drop any trailing call and ignore further calls
    pub fn detach(&self) {
        self.shared.lock().teardown();
    }

    pub fn is_detached(&self) -> bool {
        self.shared.lock().detached
    }
}

impl<A> Drop for Throttled<A> {
    fn drop(&mut self) {
        self.shared.lock().teardown();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_harness::VirtualTimer;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<(u64, u32)>>>;

    fn throttled(delay_ms: u64) -> (Throttled<u32>, VirtualTimer, Log) {
        let timer = VirtualTimer::new();
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        let clock = timer.clone();
        let sink = Arc::clone(&log);
        let throttled = Throttled::new(
            move |arg| sink.lock().unwrap().push((clock.now_ms(), arg)),
            Duration::from_millis(delay_ms),
            Arc::new(timer.clone()),
        );
        (throttled, timer, log)
    }

    #[test]
    fn test_leading_and_trailing() {
        let (throttled, timer, log) = throttled(100);

        assert_eq!(throttled.call(1), CallOutcome::Invoked);
        timer.advance_ms(10);
        assert_eq!(
            throttled.call(2),
            CallOutcome::Scheduled {
                after: Duration::from_millis(90)
            }
        );
        timer.advance_ms(30);
        assert_eq!(throttled.call(3), CallOutcome::Coalesced);

        timer.advance_ms(100);
        assert_eq!(*log.lock().unwrap(), vec![(0, 1), (100, 3)]);
        assert_eq!(throttled.invocations(), 2);
    }

    #[test]
    fn test_zero_delay_never_defers() {
        let (throttled, timer, log) = throttled(0);
        for arg in 0..5 {
            assert_eq!(throttled.call(arg), CallOutcome::Invoked);
        }
        assert_eq!(timer.pending_timers(), 0);
        assert_eq!(log.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_trailing_fire_restarts_cooldown() {
        let (throttled, timer, log) = throttled(100);

        throttled.call(1);
        timer.advance_ms(20);
        throttled.call(2);
        timer.advance_ms(80);
        assert_eq!(log.lock().unwrap().last(), Some(&(100, 2)));

        // Cooldown now runs from the trailing fire at t=100.
        timer.advance_ms(50);
        assert_eq!(
            throttled.call(3),
            CallOutcome::Scheduled {
                after: Duration::from_millis(50)
            }
        );
        timer.advance_ms(50);
        assert_eq!(log.lock().unwrap().last(), Some(&(200, 3)));
    }

    #[test]
    fn test_call_after_cooldown_is_immediate() {
        let (throttled, timer, log) = throttled(100);
        throttled.call(1);
        timer.advance_ms(100);
        assert_eq!(throttled.call(2), CallOutcome::Invoked);
        assert_eq!(*log.lock().unwrap(), vec![(0, 1), (100, 2)]);
    }

    #[test]
    fn test_set_delay_starts_fresh() {
        let (throttled, timer, log) = throttled(100);
        throttled.call(1);
        throttled.call(2);
        assert!(throttled.has_pending());

        throttled.set_delay(Duration::from_millis(300));
        assert!(!throttled.has_pending());
        assert_eq!(throttled.call(3), CallOutcome::Invoked);

        timer.advance_ms(1000);
        assert_eq!(*log.lock().unwrap(), vec![(0, 1), (0, 3)]);
    }

    #[test]
    fn test_detach_drops_trailing_call() {
        let (throttled, timer, log) = throttled(100);
        throttled.call(1);
        throttled.call(2);
        throttled.detach();

        timer.advance_ms(500);
        assert_eq!(*log.lock().unwrap(), vec![(0, 1)]);
        assert_eq!(throttled.call(3), CallOutcome::Ignored);
        assert_eq!(timer.pending_timers(), 0);
    }
}
