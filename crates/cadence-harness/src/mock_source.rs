//! Mock Sources for Testing
//!
//! Scripted implementations of [`FetchSource`] and [`Transport`] with
//! per-descriptor latency and outcomes. Latency is slept on `tokio::time`,
//! so tests running with a paused clock control completion order exactly.

use async_trait::async_trait;
use cadence_core::{FetchError, FetchSource, RawResponse, RequestDescriptor, Transport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{sleep, Duration};
use tracing::debug;

// ----------------------------------------------------------------------------
// Scripted Outcomes
// ----------------------------------------------------------------------------

/// One scripted completion: how long it takes and what it yields
#[derive(Debug, Clone)]
pub struct Scripted<T> {
    pub latency: Duration,
    pub result: Result<T, FetchError>,
}

impl<T> Scripted<T> {
    pub fn ok(value: T, latency_ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(latency_ms),
            result: Ok(value),
        }
    }

    pub fn err(error: FetchError, latency_ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(latency_ms),
            result: Err(error),
        }
    }
}

struct Rule<D, T> {
    descriptor: D,
    // The last outcome repeats once the queue is down to one.
    outcomes: VecDeque<Scripted<T>>,
}

/// Call counters for a mock source
#[derive(Debug, Default)]
pub struct MockSourceStats {
    pub started: AtomicU64,
    pub completed: AtomicU64,
    pub unscripted: AtomicU64,
}

// ----------------------------------------------------------------------------
// Mock Source
// ----------------------------------------------------------------------------

/// Scripted [`FetchSource`] keyed by descriptor equality
pub struct MockSource<D, T> {
    rules: Mutex<Vec<Rule<D, T>>>,
    calls: Mutex<Vec<D>>,
    stats: Arc<MockSourceStats>,
}

impl<D, T> Default for MockSource<D, T> {
    fn default() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            stats: Arc::new(MockSourceStats::default()),
        }
    }
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<D, T> MockSource<D, T>
where
    D: PartialEq + Clone,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next outcome for `descriptor`
    ///
    /// Outcomes queue up per descriptor and are consumed one per call; the
    /// final one keeps answering further calls.
    pub fn respond(self, descriptor: D, outcome: Scripted<T>) -> Self {
        self.push(descriptor, outcome);
        self
    }

    /// Script an outcome on a shared source
    pub fn push(&self, descriptor: D, outcome: Scripted<T>) {
        let mut rules = lock(&self.rules);
        match rules.iter_mut().find(|rule| rule.descriptor == descriptor) {
            Some(rule) => rule.outcomes.push_back(outcome),
            None => rules.push(Rule {
                descriptor,
                outcomes: VecDeque::from([outcome]),
            }),
        }
    }

    /// Descriptors performed so far, in call order
    pub fn calls(&self) -> Vec<D> {
        lock(&self.calls).clone()
    }

    pub fn stats(&self) -> Arc<MockSourceStats> {
        Arc::clone(&self.stats)
    }

    pub fn started(&self) -> u64 {
        self.stats.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u64 {
        self.stats.completed.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, descriptor: &D) -> Option<Scripted<T>> {
        let mut rules = lock(&self.rules);
        let rule = rules.iter_mut().find(|rule| &rule.descriptor == descriptor)?;
        if rule.outcomes.len() > 1 {
            rule.outcomes.pop_front()
        } else {
            rule.outcomes.front().cloned()
        }
    }

    async fn run(&self, descriptor: D) -> Result<T, FetchError> {
        self.stats.started.fetch_add(1, Ordering::SeqCst);
        let outcome = self.next_outcome(&descriptor);
        lock(&self.calls).push(descriptor);

        let Some(outcome) = outcome else {
            self.stats.unscripted.fetch_add(1, Ordering::SeqCst);
            return Err(FetchError::transport("no scripted response"));
        };

        sleep(outcome.latency).await;
        self.stats.completed.fetch_add(1, Ordering::SeqCst);
        debug!("Mock source completed after {:?}", outcome.latency);
        outcome.result
    }
}

#[async_trait]
impl<D, T> FetchSource<D> for MockSource<D, T>
where
    D: PartialEq + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    async fn perform(&self, descriptor: D) -> Result<T, FetchError> {
        self.run(descriptor).await
    }
}

// ----------------------------------------------------------------------------
// Mock Transport
// ----------------------------------------------------------------------------

/// Scripted [`Transport`] keyed by resource name
#[derive(Default)]
pub struct MockTransport {
    inner: MockSource<String, RawResponse>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `resource` with a raw response after `latency_ms`
    pub fn respond(self, resource: &str, response: RawResponse, latency_ms: u64) -> Self {
        self.inner
            .push(resource.to_string(), Scripted::ok(response, latency_ms));
        self
    }

    /// Fail `resource` at the transport level after `latency_ms`
    pub fn fail(self, resource: &str, reason: &str, latency_ms: u64) -> Self {
        self.inner.push(
            resource.to_string(),
            Scripted::err(FetchError::transport(reason), latency_ms),
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.inner.calls()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse, FetchError> {
        self.inner.run(request.resource.clone()).await
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
