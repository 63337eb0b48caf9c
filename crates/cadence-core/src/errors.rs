//! Error types for the Cadence primitives
//!
//! Two families live here: [`FetchError`], the normalized failure an async
//! resource surfaces to its consumer, and [`CadenceError`], returned by the
//! controller APIs themselves.

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Fetch Errors
// ----------------------------------------------------------------------------

/// Failure of a single fetch operation
///
/// All three variants surface identically as a failed state; the variant only
/// changes the message and [`FetchError::kind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Transport failure: {reason}")]
    Transport { reason: String },
    #[error("Request completed with status {status}: {reason}")]
    Unsuccessful { status: u16, reason: String },
    #[error("Failed to decode response payload: {reason}")]
    Decode { reason: String },
}

/// Classification of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchErrorKind {
    /// The operation could not be performed at all
    Transport,
    /// The operation completed but reported an unsuccessful outcome
    Unsuccessful,
    /// The payload of a successful response could not be interpreted
    Decode,
}

impl FetchError {
    pub fn transport(reason: impl Into<String>) -> Self {
        FetchError::Transport {
            reason: reason.into(),
        }
    }

    pub fn unsuccessful(status: u16, reason: impl Into<String>) -> Self {
        FetchError::Unsuccessful {
            status,
            reason: reason.into(),
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        FetchError::Decode {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport { .. } => FetchErrorKind::Transport,
            FetchError::Unsuccessful { .. } => FetchErrorKind::Unsuccessful,
            FetchError::Decode { .. } => FetchErrorKind::Decode,
        }
    }

    /// Status code reported by the remote side, if the request got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Unsuccessful { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Controller Errors
// ----------------------------------------------------------------------------

/// Errors returned by the Cadence controller APIs
#[derive(Debug, thiserror::Error)]
pub enum CadenceError {
    #[error("No tokio runtime available: {reason}")]
    RuntimeUnavailable { reason: String },
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
    #[error("No request descriptor has been observed yet")]
    NoDescriptor,
    #[error("Controller has been detached")]
    Detached,
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

impl CadenceError {
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        CadenceError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

/// Result type for Cadence controller operations
pub type CadenceResult<T> = core::result::Result<T, CadenceError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
