//! # Retrying Invoker
//!
//! [`Retrying`] wraps any [`Invoke`] implementation and repeats failed calls.
//! Every failure counts, whether it came from the transport or from the response envelope.
use super::{Invoke, MethodCall, RequestError};
use crate::view::Node;
use serde_json::{Map, Value};
use std::time::Duration;

/// How many attempts a call gets and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Zero behaves like one.
    pub attempts: u32,
    /// Fixed delay between two consecutive attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// An invoker that retries the inner one according to a [`RetryPolicy`].
///
/// Once the budget is exhausted the last failure is returned untouched.
#[derive(Debug, Clone)]
pub struct Retrying<I> {
    inner: I,
    policy: RetryPolicy,
}

impl<I: Invoke> Retrying<I> {
    pub fn new(inner: I, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Starts a call chain for the method `name`.
    pub fn method(&self, name: &str) -> MethodCall<'_, Self> {
        MethodCall::new(self, name)
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn into_inner(self) -> I {
        self.inner
    }
}

impl<I: Invoke> Invoke for Retrying<I> {
    async fn invoke(&self, method: &str, args: Map<String, Value>) -> Result<Node, RequestError> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.inner.invoke(method, args.clone()).await {
                Ok(result) => return Ok(result),
                Err(err) if attempt >= attempts => {
                    tracing::warn!(method, attempts, error = %err, "giving up on call");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        method,
                        attempt,
                        attempts,
                        error = %err,
                        "call failed, retrying"
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
