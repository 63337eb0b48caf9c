//! Fetch lifecycle state and its consumer-facing snapshot

use cadence_core::{Epoch, FetchError};

/// Lifecycle of the current request
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    /// No descriptor observed yet
    Idle,
    /// A request is in flight; `stale` is previous data kept for display
    Loading { stale: Option<T> },
    Succeeded(T),
    Failed(FetchError),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading { .. })
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, FetchState::Succeeded(_) | FetchState::Failed(_))
    }

    /// Data to display: the settled value, or stale data while reloading
    pub fn data(&self) -> Option<&T> {
        match self {
            FetchState::Succeeded(data) => Some(data),
            FetchState::Loading { stale } => stale.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchState::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Move out whatever data is displayable, leaving `Idle`
    pub(crate) fn take_data(&mut self) -> Option<T> {
        match std::mem::replace(self, FetchState::Idle) {
            FetchState::Succeeded(data) => Some(data),
            FetchState::Loading { stale } => stale,
            _ => None,
        }
    }
}

/// What a consumer sees on a given tick
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSnapshot<T> {
    pub state: FetchState<T>,
    pub epoch: Epoch,
    pub detached: bool,
}

impl<T> FetchSnapshot<T> {
    pub fn data(&self) -> Option<&T> {
        self.state.data()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.state.error()
    }
}
