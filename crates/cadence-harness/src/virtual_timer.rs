//! Virtual Timer - Deterministic time control for testing
//!
//! A [`TimerService`] whose clock only moves when the test calls
//! [`VirtualTimer::advance`]. Due callbacks run synchronously inside
//! `advance`, in due-time order (ties in scheduling order), with the clock
//! set to each callback's due time while it runs.

use cadence_core::{
    RepeatingCallback, TimeSource, TimerCallback, TimerId, TimerService, Timestamp,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// Virtual timer for deterministic time control in tests
#[derive(Clone, Default)]
pub struct VirtualTimer {
    state: Arc<Mutex<VirtualTimerState>>,
}

#[derive(Default)]
struct VirtualTimerState {
    now_ms: u64,
    next_id: u64,
    next_seq: u64,
    entries: BTreeMap<TimerId, Entry>,
}

struct Entry {
    due_ms: u64,
    seq: u64,
    kind: EntryKind,
}

enum EntryKind {
    Once(Option<TimerCallback>),
    // `None` while the callback is running outside the lock.
    Repeating {
        period_ms: u64,
        callback: Option<RepeatingCallback>,
    },
}

enum Due {
    Once(TimerCallback),
    Repeating(TimerId, RepeatingCallback),
}

impl VirtualTimerState {
    fn allocate(&mut self) -> (TimerId, u64) {
        self.next_id += 1;
        self.next_seq += 1;
        (TimerId::new(self.next_id), self.next_seq)
    }

    fn earliest_due(&self, limit_ms: u64) -> Option<TimerId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.due_ms <= limit_ms && entry.is_runnable())
            .min_by_key(|(_, entry)| (entry.due_ms, entry.seq))
            .map(|(id, _)| *id)
    }
}

impl Entry {
    fn is_runnable(&self) -> bool {
        match &self.kind {
            EntryKind::Once(callback) => callback.is_some(),
            EntryKind::Repeating { callback, .. } => callback.is_some(),
        }
    }
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VirtualTimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current virtual time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.lock().now_ms
    }

    /// Number of timers scheduled and not yet fired or cancelled
    pub fn pending_timers(&self) -> usize {
        self.lock().entries.len()
    }

    /// Advance virtual time by `millis`, running everything that falls due
    pub fn advance_ms(&self, millis: u64) {
        let target = self.now_ms().saturating_add(millis);
        self.advance_to(target);
    }

    /// Advance virtual time by the given duration
    pub fn advance(&self, duration: Duration) {
        self.advance_ms(duration.as_millis() as u64);
    }

    /// Advance virtual time to an absolute millisecond, never backwards
    pub fn advance_to(&self, target_ms: u64) {
        loop {
            let due = {
                let mut state = self.lock();
                let Some(id) = state.earliest_due(target_ms) else {
                    state.now_ms = state.now_ms.max(target_ms);
                    return;
                };

                let mut entry = match state.entries.remove(&id) {
                    Some(entry) => entry,
                    None => return,
                };
                state.now_ms = state.now_ms.max(entry.due_ms);

                match &mut entry.kind {
                    EntryKind::Once(callback) => match callback.take() {
                        Some(callback) => Due::Once(callback),
                        None => continue,
                    },
                    EntryKind::Repeating { period_ms, callback } => {
                        let Some(taken) = callback.take() else {
                            continue;
                        };
                        entry.due_ms += *period_ms;
                        state.next_seq += 1;
                        entry.seq = state.next_seq;
                        state.entries.insert(id, entry);
                        Due::Repeating(id, taken)
                    }
                }
            };

            match due {
                Due::Once(callback) => {
                    trace!("virtual timer fired at {}ms", self.now_ms());
                    callback();
                }
                Due::Repeating(id, mut callback) => {
                    trace!("virtual {} ticked at {}ms", id, self.now_ms());
                    callback();
                    // Put the callback back unless the tick cancelled its own timer.
                    let mut state = self.lock();
                    if let Some(Entry {
                        kind: EntryKind::Repeating { callback: slot, .. },
                        ..
                    }) = state.entries.get_mut(&id)
                    {
                        *slot = Some(callback);
                    }
                }
            }
        }
    }
}

impl TimeSource for VirtualTimer {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.now_ms())
    }
}

impl TimerService for VirtualTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let mut state = self.lock();
        let (id, seq) = state.allocate();
        let due_ms = state.now_ms.saturating_add(delay.as_millis() as u64);
        state.entries.insert(
            id,
            Entry {
                due_ms,
                seq,
                kind: EntryKind::Once(Some(callback)),
            },
        );
        id
    }

    fn schedule_repeating(&self, period: Duration, callback: RepeatingCallback) -> TimerId {
        let mut state = self.lock();
        let (id, seq) = state.allocate();
        let period_ms = (period.as_millis() as u64).max(1);
        let due_ms = state.now_ms.saturating_add(period_ms);
        state.entries.insert(
            id,
            Entry {
                due_ms,
                seq,
                kind: EntryKind::Repeating {
                    period_ms,
                    callback: Some(callback),
                },
            },
        );
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        self.lock().entries.remove(&id).is_some()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
