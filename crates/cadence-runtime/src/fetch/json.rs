//! JSON response adapter
//!
//! Turns a raw [`Transport`] into a [`FetchSource`] that yields decoded
//! values, classifying non-success statuses and malformed bodies.

use async_trait::async_trait;
use cadence_core::{FetchConfig, FetchError, FetchSource, RequestDescriptor, Transport};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::ops::RangeInclusive;
use tracing::trace;

/// Longest body excerpt carried in an unsuccessful-status error
const MAX_REASON_LEN: usize = 256;

/// [`FetchSource`] decoding JSON bodies from a [`Transport`]
pub struct JsonSource<Tr, T> {
    transport: Tr,
    success: RangeInclusive<u16>,
    _output: PhantomData<fn() -> T>,
}

impl<Tr, T> JsonSource<Tr, T> {
    pub fn new(transport: Tr, config: &FetchConfig) -> Self {
        Self {
            transport,
            success: config.success_statuses(),
            _output: PhantomData,
        }
    }

    pub fn transport(&self) -> &Tr {
        &self.transport
    }
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(MAX_REASON_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[async_trait]
impl<Tr, T> FetchSource<RequestDescriptor> for JsonSource<Tr, T>
where
    Tr: Transport,
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    async fn perform(&self, descriptor: RequestDescriptor) -> Result<T, FetchError> {
        let response = self.transport.execute(&descriptor).await?;
        trace!("{} answered with status {}", descriptor, response.status);

        if !self.success.contains(&response.status) {
            return Err(FetchError::unsuccessful(
                response.status,
                excerpt(&response.body_text()),
            ));
        }

        serde_json::from_slice(&response.body).map_err(|e| FetchError::decode(e.to_string()))
    }
}
