//! Async Resource
//!
//! Ties one outstanding async operation to a changing request descriptor.
//! Every trigger moves the epoch forward and captures it in the spawned task;
//! a settlement only lands if its captured epoch is still the live one, so
//! results apply in trigger order regardless of completion order.

use super::state::{FetchSnapshot, FetchState};
use crate::shared::Shared;
use cadence_core::{
    CadenceError, CadenceResult, Epoch, FetchConfig, FetchError, FetchSource, RetainPolicy,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

/// Epoch-gated async operation bound to a request descriptor
pub struct AsyncResource<D, S>
where
    S: FetchSource<D>,
    D: Send + 'static,
{
    handle: Handle,
    source: Arc<S>,
    config: FetchConfig,
    shared: Arc<Shared<ResourceState<D, S::Output>>>,
}

struct ResourceState<D, T> {
    descriptor: Option<D>,
    epoch: Epoch,
    state: FetchState<T>,
    in_flight: Option<AbortHandle>,
    detached: bool,
    snapshots: watch::Sender<FetchSnapshot<T>>,
}

impl<D, T: Clone> ResourceState<D, T> {
    fn snapshot(&self) -> FetchSnapshot<T> {
        FetchSnapshot {
            state: self.state.clone(),
            epoch: self.epoch,
            detached: self.detached,
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    fn settle(&mut self, epoch: Epoch, result: Result<T, FetchError>) {
        if self.detached {
            trace!("Dropping settlement of {} after detach", epoch);
            return;
        }
        if epoch != self.epoch {
            trace!("Dropping stale settlement of {} (live {})", epoch, self.epoch);
            return;
        }

        self.in_flight = None;
        self.state = match result {
            Ok(data) => {
                debug!("Request {} succeeded", epoch);
                FetchState::Succeeded(data)
            }
            Err(error) => {
                debug!("Request {} failed: {}", epoch, error);
                FetchState::Failed(error)
            }
        };
        self.publish();
    }

    fn teardown(&mut self, abort: bool) {
        if self.detached {
            return;
        }
        self.detached = true;
        if let Some(task) = self.in_flight.take() {
            if abort {
                task.abort();
            }
            debug!("Detached with {} in flight", self.epoch);
        }
        self.publish();
    }
}

impl<D, S> AsyncResource<D, S>
where
    D: Clone + PartialEq + Send + 'static,
    S: FetchSource<D> + 'static,
    S::Output: Clone + Send + Sync,
{
    /// Create an idle resource on the current tokio runtime
    pub fn new(source: Arc<S>, config: FetchConfig) -> CadenceResult<Self> {
        let handle = Handle::try_current().map_err(|e| CadenceError::RuntimeUnavailable {
            reason: e.to_string(),
        })?;
        Ok(Self::with_handle(handle, source, config))
    }

    /// Create an idle resource spawning onto `handle`
    pub fn with_handle(handle: Handle, source: Arc<S>, config: FetchConfig) -> Self {
        let (snapshots, _) = watch::channel(FetchSnapshot {
            state: FetchState::Idle,
            epoch: Epoch::INITIAL,
            detached: false,
        });
        Self {
            handle,
            source,
            config,
            shared: Shared::new(ResourceState {
                descriptor: None,
                epoch: Epoch::INITIAL,
                state: FetchState::Idle,
                in_flight: None,
                detached: false,
                snapshots,
            }),
        }
    }

    /// Create a resource and immediately start the first request
    pub fn attach(source: Arc<S>, descriptor: D, config: FetchConfig) -> CadenceResult<Self> {
        let resource = Self::new(source, config)?;
        resource.observe(descriptor);
        Ok(resource)
    }

    /// Feed this tick's descriptor and return the current snapshot
    ///
    /// A descriptor different from the last one starts a new request.
    pub fn observe(&self, descriptor: D) -> FetchSnapshot<S::Output> {
        let mut state = self.shared.lock();
        if !state.detached && state.descriptor.as_ref() != Some(&descriptor) {
            state.descriptor = Some(descriptor.clone());
            self.start(&mut state, descriptor);
        }
        state.snapshot()
    }

    /// Restart the request for the current descriptor
    pub fn refetch(&self) -> CadenceResult<Epoch> {
        let mut state = self.shared.lock();
        if state.detached {
            return Err(CadenceError::Detached);
        }
        let descriptor = state.descriptor.clone().ok_or(CadenceError::NoDescriptor)?;
        debug!("Manual refetch");
        Ok(self.start(&mut state, descriptor))
    }

    fn start(&self, state: &mut ResourceState<D, S::Output>, descriptor: D) -> Epoch {
        if let Some(task) = state.in_flight.take() {
            if self.config.abort_superseded {
                task.abort();
                trace!("Aborted superseded {}", state.epoch);
            }
        }

        state.epoch = state.epoch.next();
        let epoch = state.epoch;
        let stale = match self.config.retain {
            RetainPolicy::Clear => None,
            RetainPolicy::KeepPrevious => state.state.take_data(),
        };
        state.state = FetchState::Loading { stale };
        state.publish();

        let source = Arc::clone(&self.source);
        let weak = Arc::downgrade(&self.shared);
        let task = self.handle.spawn(async move {
            let result = source.perform(descriptor).await;
            if let Some(shared) = weak.upgrade() {
                shared.lock().settle(epoch, result);
            }
        });
        state.in_flight = Some(task.abort_handle());

        debug!("Started request {}", epoch);
        epoch
    }

    pub fn snapshot(&self) -> FetchSnapshot<S::Output> {
        self.shared.lock().snapshot()
    }

    pub fn epoch(&self) -> Epoch {
        self.shared.lock().epoch
    }

    pub fn descriptor(&self) -> Option<D> {
        self.shared.lock().descriptor.clone()
    }

    /// Receiver notified on every state transition
    pub fn subscribe(&self) -> watch::Receiver<FetchSnapshot<S::Output>> {
        self.shared.lock().snapshots.subscribe()
    }

    /// Wait until the live request settles or the resource is detached
    pub async fn settled(&self) -> FetchSnapshot<S::Output> {
        let mut snapshots = self.subscribe();
        let settled = snapshots
            .wait_for(|snapshot| snapshot.detached || !snapshot.is_loading())
            .await
            .map(|snapshot| snapshot.clone());
        match settled {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    /// Tear down: abandon in-flight work and ignore further input
    pub fn detach(&self) {
        self.shared.lock().teardown(self.config.abort_superseded);
    }

    pub fn is_detached(&self) -> bool {
        self.shared.lock().detached
    }
}

impl<D, S> Drop for AsyncResource<D, S>
where
    S: FetchSource<D>,
    D: Send + 'static,
{
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if state.detached {
            return;
        }
        state.detached = true;
        if let Some(task) = state.in_flight.take() {
            if self.config.abort_superseded {
                task.abort();
            }
        }
    }
}
