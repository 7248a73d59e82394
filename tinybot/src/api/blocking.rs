//! # Blocking Adapter
//!
//! [`Blocking`] exposes any [`Invoke`] implementation to synchronous code, with the same
//! chaining as the async proxy.
//!
//! Calls are driven on the runtime behind the stored [`Handle`]:
//!
//! * Outside of any runtime, the current thread simply blocks on the call.
//! * On a blocking pool thread (e.g. inside [`tokio::task::spawn_blocking`]) the thread blocks
//!   on the call while the runtime keeps driving its other tasks.
//! * On a multi-thread runtime worker, the worker is handed off with
//!   [`tokio::task::block_in_place`] first, so the other tasks it was running keep making progress.
//! * On the thread driving a current-thread runtime there is no worker to hand off to, and the
//!   call fails with [`RequestError::BlockingContext`] instead of deadlocking.
use super::{Invoke, RequestError, into_arguments};
use crate::view::Node;
use serde::Serialize;
use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};
use tokio::runtime::{Handle, TryCurrentError};

pub struct Blocking<I> {
    inner: I,
    handle: Handle,
}

impl<I: Invoke> Blocking<I> {
    pub fn new(inner: I, handle: Handle) -> Self {
        Self { inner, handle }
    }

    /// Binds the adapter to the runtime the caller is currently running in.
    pub fn try_current(inner: I) -> Result<Self, TryCurrentError> {
        Ok(Self::new(inner, Handle::try_current()?))
    }

    /// Starts a call chain for the method `name`.
    pub fn method(&self, name: &str) -> BlockingCall<'_, I> {
        BlockingCall {
            blocking: self,
            name: name.to_string(),
        }
    }

    /// Performs a call and waits for its result.
    pub fn invoke(&self, method: &str, args: Map<String, Value>) -> Result<Node, RequestError> {
        let call = self.inner.invoke(method, args);

        if Handle::try_current().is_err() {
            return self.handle.block_on(call);
        }

        // block_in_place only refuses to run on the thread driving a current-thread runtime,
        // and does so before calling the closure
        let mut started = false;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            tokio::task::block_in_place(|| {
                started = true;
                self.handle.block_on(call)
            })
        }));

        match outcome {
            Ok(result) => result,
            Err(_) if !started => Err(RequestError::BlockingContext {
                method: method.to_string(),
            }),
            Err(panic) => panic::resume_unwind(panic),
        }
    }

    pub fn into_inner(self) -> I {
        self.inner
    }
}

/// The synchronous counterpart of [`super::MethodCall`].
pub struct BlockingCall<'a, I> {
    blocking: &'a Blocking<I>,
    name: String,
}

impl<'a, I: Invoke> BlockingCall<'a, I> {
    /// Returns a new call for the sub-method `{self.name}.{name}`.
    pub fn chain(&self, name: &str) -> BlockingCall<'a, I> {
        BlockingCall {
            blocking: self.blocking,
            name: format!("{}.{}", self.name, name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Performs the call and waits for its result. See [`super::MethodCall::invoke`].
    pub fn invoke(self, args: impl Serialize) -> Result<Node, RequestError> {
        let args = into_arguments(&self.name, args)?;
        self.blocking.invoke(&self.name, args)
    }
}
