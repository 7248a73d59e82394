//! # Update Dispatch
//!
//! An update is a JSON mapping with an `update_id` and one populated field naming its kind
//! (`message`, `callback_query`, ...). The [`Dispatcher`] routes each populated field to the
//! [`Handler`] registered for that kind.
//!
//! Every sub-payload is rebased before it reaches its handler, so error paths read from the
//! handler's point of view (`.message.voice` rather than `.voice`).
//!
//! Each handler run is an isolated unit of work: its failure, or even its panic, is logged and
//! recorded in the [`Dispatched`] report, and never stops the remaining handlers.
use crate::{
    BoxError,
    api::RequestError,
    view::{Node, ViewError},
};
use async_trait::async_trait;
use futures_util::FutureExt;
use std::{any::Any, collections::BTreeMap, panic::AssertUnwindSafe};

const UPDATE_ID: &str = "update_id";

/// Errors a handler can return. The narrow variants come straight from the core operations,
/// so handlers can use `?` everywhere.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Other(BoxError),
}

impl HandlerError {
    pub fn other(err: impl Into<BoxError>) -> Self {
        HandlerError::Other(err.into())
    }
}

/// Handles one kind of update. `I` is the invoker used to answer, usually [`crate::api::Api`].
#[async_trait]
pub trait Handler<I: ?Sized + Sync>: Send + Sync {
    async fn handle(&self, data: Node, api: &I) -> Result<(), HandlerError>;
}

struct Registration<I: ?Sized + Sync> {
    label: String,
    handler: Box<dyn Handler<I>>,
}

/// What happened to the fields of one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatched {
    pub update_id: Option<i64>,
    pub handled: Vec<String>,
    pub unhandled: Vec<String>,
    pub failed: Vec<String>,
}

pub struct Dispatcher<I: ?Sized + Sync> {
    handlers: BTreeMap<String, Registration<I>>,
}

impl<I: ?Sized + Sync> Default for Dispatcher<I> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }
}

impl<I: ?Sized + Sync> Dispatcher<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for the updates of `kind`. Its payload is rebased to `.{kind}`.
    pub fn register(self, kind: &str, handler: impl Handler<I> + 'static) -> Self {
        self.register_as(kind, kind, handler)
    }

    /// Registers `handler` for the updates of `kind`, rebasing its payload to `.{label}`.
    pub fn register_as(
        mut self,
        kind: &str,
        label: &str,
        handler: impl Handler<I> + 'static,
    ) -> Self {
        self.handlers.insert(
            kind.to_string(),
            Registration {
                label: label.to_string(),
                handler: Box::new(handler),
            },
        );
        self
    }

    /// The kinds of update with a registered handler, sorted.
    ///
    /// This is the `allowed_updates` list to subscribe with.
    pub fn allowed_updates(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Routes every populated field of `update` to its handler.
    pub async fn dispatch(&self, update: &Node, api: &I) -> Dispatched {
        let mut report = Dispatched {
            update_id: update.get(UPDATE_ID).and_then(|id| id.as_i64()).ok(),
            ..Dispatched::default()
        };

        let items = match update.items() {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(error = %err, "dropping an update that is not a mapping");
                return report;
            }
        };

        for (kind, data) in items {
            if kind == UPDATE_ID {
                continue;
            }

            let Some(registration) = self.handlers.get(kind) else {
                tracing::warn!(
                    kind,
                    "received an update for '{kind}', but no handler exists for it"
                );
                report.unhandled.push(kind.to_string());
                continue;
            };

            let data = data.rebase(&registration.label);
            let outcome = AssertUnwindSafe(registration.handler.handle(data, api))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => {
                    tracing::debug!(kind, "handled '{kind}' update successfully");
                    report.handled.push(kind.to_string());
                    continue;
                }
                Ok(Err(HandlerError::Request(err))) => {
                    tracing::warn!(
                        kind,
                        method = err.method(),
                        error = %err,
                        "failed handling '{kind}' update"
                    );
                }
                Ok(Err(HandlerError::View(err))) => {
                    tracing::warn!(
                        kind,
                        path = err.path(),
                        error = %err,
                        "failed handling '{kind}' update"
                    );
                }
                Ok(Err(HandlerError::Other(err))) => {
                    tracing::error!(
                        kind,
                        error = ?err,
                        "unexpected failure handling '{kind}' update"
                    );
                }
                Err(panic) => {
                    tracing::error!(
                        kind,
                        panic = panic_message(&*panic),
                        "handler for '{kind}' update panicked"
                    );
                }
            }

            report.failed.push(kind.to_string());
        }

        report
    }

    /// Parses a raw payload, e.g. a webhook request body, and dispatches it.
    pub async fn dispatch_json(
        &self,
        payload: &[u8],
        api: &I,
    ) -> Result<Dispatched, serde_json::Error> {
        let update = Node::from_slice(payload)?;
        Ok(self.dispatch(&update, api).await)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
