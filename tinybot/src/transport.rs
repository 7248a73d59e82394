//! # Transport
//!
//! The transport is the only component that talks to the network. It receives a method name and
//! the JSON arguments of a call and returns the decoded JSON response, whatever it contains.
//! Envelope validation happens one layer up, in [`crate::api`].
//!
//! [`http::HttpTransport`] is the default implementation. Tests and alternative backends can
//! implement [`Transport`] directly.
pub mod http;

use crate::BoxError;
use serde_json::{Map, Value};
use std::future::Future;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to build the HTTP client: '{0}'")]
    Client(#[source] reqwest::Error),
    #[error("HTTP request for '{method}' failed: '{source}'")]
    Http {
        method: String,
        source: reqwest::Error,
    },
    #[error("Failed to decode the JSON response of '{method}': '{source}'")]
    Decode {
        method: String,
        source: reqwest::Error,
    },
    #[error("Failed to download a file: '{0}'")]
    Download(#[source] reqwest::Error),
    #[error(transparent)]
    Other(BoxError),
}

impl TransportError {
    /// Wraps an error coming from a custom transport.
    pub fn other(err: impl Into<BoxError>) -> Self {
        TransportError::Other(err.into())
    }
}

/// Performs one round-trip with the remote service.
pub trait Transport: Send + Sync {
    fn call(
        &self,
        method: &str,
        args: Map<String, Value>,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}
