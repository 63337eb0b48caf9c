//! Integration tests for the pacing controllers and interval runner on the
//! tokio timer service
//!
//! Every test runs with a paused clock, so `sleep` advances virtual time
//! deterministically and timer tasks fire at exact offsets.

use cadence_runtime::{
    CallOutcome, Debounced, IntervalRunner, PacingConfig, Throttled, TokioTimerService,
};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration, Instant};

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

fn timer_service() -> Arc<TokioTimerService> {
    Arc::new(TokioTimerService::new().expect("test runs inside a runtime"))
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

type Log<T> = Arc<Mutex<Vec<(u64, T)>>>;

fn recorder<T: Send + 'static>(start: Instant) -> (Log<T>, impl Fn(T) + Send + Sync + 'static) {
    let log: Log<T> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let record = move |value| {
        let at = start.elapsed().as_millis() as u64;
        sink.lock().unwrap().push((at, value));
    };
    (log, record)
}

// ----------------------------------------------------------------------------
// Debounce
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_debounce_quiescence() {
    let timer = timer_service();
    let debounced = Debounced::with_default_delay("a".to_string(), timer.clone());

    sleep(ms(50)).await;
    assert_eq!(debounced.observe("ab".to_string()), "a");
    sleep(ms(50)).await;
    assert_eq!(debounced.observe("abc".to_string()), "a");

    sleep(ms(490)).await;
    assert_eq!(debounced.current(), "a");

    sleep(ms(20)).await;
    assert_eq!(debounced.current(), "abc");
    assert_eq!(timer.active_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_subscriber_sees_single_publish() {
    let timer = timer_service();
    let debounced = Debounced::new(0u32, ms(100), timer);
    let mut published = debounced.subscribe();

    for value in 1..=5 {
        debounced.observe(value);
        sleep(ms(20)).await;
    }

    published.changed().await.unwrap();
    assert_eq!(*published.borrow_and_update(), 5);
    assert!(!published.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_debounce_detach_cancels_timer_task() {
    let timer = timer_service();
    let debounced = Debounced::new(0u32, ms(100), timer.clone());

    debounced.observe(1);
    assert_eq!(timer.active_timers(), 1);
    debounced.detach();
    assert_eq!(timer.active_timers(), 0);

    sleep(ms(500)).await;
    assert_eq!(debounced.current(), 0);
}

// ----------------------------------------------------------------------------
// Throttle
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_throttle_leading_and_trailing() {
    let timer = timer_service();
    let (log, record) = recorder::<u32>(Instant::now());
    let throttled = Throttled::new(record, ms(100), timer);

    assert_eq!(throttled.call(1), CallOutcome::Invoked);
    sleep(ms(10)).await;
    assert!(matches!(throttled.call(2), CallOutcome::Scheduled { .. }));
    sleep(ms(30)).await;
    assert_eq!(throttled.call(3), CallOutcome::Coalesced);

    sleep(ms(100)).await;
    assert_eq!(*log.lock().unwrap(), vec![(0, 1), (100, 3)]);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_zero_delay() {
    let timer = timer_service();
    let (log, record) = recorder::<u32>(Instant::now());
    let throttled = Throttled::new(record, Duration::ZERO, timer.clone());

    for value in 0..10 {
        assert_eq!(throttled.call(value), CallOutcome::Invoked);
    }
    assert_eq!(log.lock().unwrap().len(), 10);
    assert_eq!(timer.active_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_from_config_preset() {
    let timer = timer_service();
    let (log, record) = recorder::<&'static str>(Instant::now());
    let throttled = Throttled::with_config(record, &PacingConfig::conservative(), timer);
    assert_eq!(throttled.delay(), ms(500));

    throttled.call("first");
    throttled.call("second");
    throttled.call("third");
    sleep(ms(600)).await;

    assert_eq!(*log.lock().unwrap(), vec![(0, "first"), (500, "third")]);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_drop_cancels_trailing() {
    let timer = timer_service();
    let (log, record) = recorder::<u32>(Instant::now());
    let throttled = Throttled::new(record, ms(100), timer.clone());

    throttled.call(1);
    throttled.call(2);
    drop(throttled);
    assert_eq!(timer.active_timers(), 0);

    sleep(ms(300)).await;
    assert_eq!(*log.lock().unwrap(), vec![(0, 1)]);
}

// ----------------------------------------------------------------------------
// Interval
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_interval_latest_callback_without_phase_reset() {
    let timer = timer_service();
    let start = Instant::now();
    let (log, record_a) = recorder::<&'static str>(start);
    let record_b = {
        let log = Arc::clone(&log);
        move || {
            let at = start.elapsed().as_millis() as u64;
            log.lock().unwrap().push((at, "b"));
        }
    };

    let runner = IntervalRunner::new(move || record_a("a"), Some(ms(1000)), timer).unwrap();

    sleep(ms(500)).await;
    runner.observe(record_b, Some(ms(1000))).unwrap();
    sleep(ms(600)).await;

    assert_eq!(*log.lock().unwrap(), vec![(1000, "b")]);
    assert_eq!(runner.fire_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_interval_pause_and_detach() {
    let timer = timer_service();
    let (log, record) = recorder::<()>(Instant::now());
    let runner = IntervalRunner::new(move || record(()), Some(ms(100)), timer.clone()).unwrap();

    sleep(ms(250)).await;
    runner.pause();
    assert!(!runner.is_active());
    assert_eq!(timer.active_timers(), 0);

    sleep(ms(500)).await;
    assert_eq!(log.lock().unwrap().len(), 2);

    runner.set_period(Some(ms(100))).unwrap();
    sleep(ms(150)).await;
    runner.detach();
    sleep(ms(500)).await;
    assert_eq!(log.lock().unwrap().len(), 3);
}
