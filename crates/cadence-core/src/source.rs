//! Async Operation Sources
//!
//! Defines the seams an async resource performs its work through. A
//! [`FetchSource`] is the opaque "perform request, get result or failure"
//! operation; a [`Transport`] is the lower-level raw exchange that response
//! adapters classify and decode.

use crate::errors::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

// ----------------------------------------------------------------------------
// Fetch Source Trait
// ----------------------------------------------------------------------------

/// An asynchronous operation keyed by a request descriptor
///
/// The resource manager never inspects what `perform` does; it only needs the
/// eventual value or a normalized [`FetchError`].
#[async_trait]
pub trait FetchSource<D>: Send + Sync
where
    D: Send + 'static,
{
    type Output: Send + 'static;

    async fn perform(&self, descriptor: D) -> Result<Self::Output, FetchError>;
}

/// Adapts an async closure into a [`FetchSource`]
pub struct FnSource<F>(F);

impl<F> FnSource<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<D, T, F, Fut> FetchSource<D> for FnSource<F>
where
    D: Send + 'static,
    T: Send + 'static,
    F: Fn(D) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    type Output = T;

    async fn perform(&self, descriptor: D) -> Result<T, FetchError> {
        (self.0)(descriptor).await
    }
}

// ----------------------------------------------------------------------------
// Request Descriptor
// ----------------------------------------------------------------------------

/// Resource identifier plus options, compared by value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub resource: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl RequestDescriptor {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        let mut separator = '?';
        for (key, value) in &self.options {
            write!(f, "{}{}={}", separator, key, value)?;
            separator = '&';
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Raw outcome of a transport exchange, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A 200 response with the given body
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Performs a raw request/response exchange
///
/// Implementations return `Err` only when the exchange could not happen at
/// all; any response that arrived, whatever its status, is `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse, FetchError>;
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
