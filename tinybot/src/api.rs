//! # Dynamic API Calls
//!
//! This module turns chained method names into remote calls, without any generated bindings.
//!
//! ## How it works
//!
//! * [`Api::method`] returns a [`MethodCall`] remembering a method name. Chaining it with
//!   [`MethodCall::chain`] builds dotted names (e.g. `sendMedia.attach`) and never touches the
//!   network.
//! * [`MethodCall::invoke`] serializes the arguments into a JSON object and hands them to the
//!   underlying [`Invoke`] implementation. That is the only suspension point of a call.
//! * The [`Api`] invoker merges the configured predefined arguments, performs the transport
//!   round-trip and validates the `{ok, result|description}` envelope (see [`envelope`]).
//!
//! Invokers can be decorated: [`retry::Retrying`] retries failed calls with a fixed backoff, and
//! [`blocking::Blocking`] drives calls to completion from synchronous code.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tinybot::{api::Api, config::ApiConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Api::http(ApiConfig::telegram("echo-bot", "123:token"))?;
//!
//! let me = api.method("getMe").invoke(()).await?;
//! println!("running as @{}", me.get("username")?.as_str()?);
//!
//! api.method("sendMessage")
//!     .invoke(serde_json::json!({ "chat_id": 7, "text": "hi" }))
//!     .await?;
//! # Ok(())
//! # }
//! ```
pub mod blocking;
pub mod envelope;
pub mod retry;

use crate::{
    config::ApiConfig,
    files::FileLinkCache,
    transport::{Transport, TransportError, http::HttpTransport},
    view::Node,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{fmt, future::Future, sync::Arc};

/// Errors that can occur while performing a remote call.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Transport failure calling '{method}': {source}")]
    Transport {
        method: String,
        #[source]
        source: TransportError,
    },
    #[error("Server error calling '{method}': {description}")]
    Remote { method: String, description: String },
    #[error("Bad response calling '{method}': {response}")]
    MalformedResponse { method: String, response: Value },
    #[error("Invalid arguments for '{method}': {message}")]
    InvalidArguments { method: String, message: String },
    #[error("Cannot block on '{method}' from inside a current-thread runtime")]
    BlockingContext { method: String },
}

impl RequestError {
    /// The dotted name of the method that failed.
    pub fn method(&self) -> &str {
        match self {
            RequestError::Transport { method, .. }
            | RequestError::Remote { method, .. }
            | RequestError::MalformedResponse { method, .. }
            | RequestError::InvalidArguments { method, .. }
            | RequestError::BlockingContext { method } => method,
        }
    }
}

/// Something that can perform a named call with JSON arguments.
///
/// This is the seam every proxy is built on: [`Api`] implements it by talking to a [`Transport`],
/// decorators implement it by wrapping another invoker.
pub trait Invoke: Send + Sync {
    fn invoke(
        &self,
        method: &str,
        args: Map<String, Value>,
    ) -> impl Future<Output = Result<Node, RequestError>> + Send;
}

impl<I: Invoke> Invoke for &I {
    fn invoke(
        &self,
        method: &str,
        args: Map<String, Value>,
    ) -> impl Future<Output = Result<Node, RequestError>> + Send {
        (**self).invoke(method, args)
    }
}

impl<I: Invoke> Invoke for Arc<I> {
    fn invoke(
        &self,
        method: &str,
        args: Map<String, Value>,
    ) -> impl Future<Output = Result<Node, RequestError>> + Send {
        (**self).invoke(method, args)
    }
}

/// A pending call: an invoker plus an accumulated dotted method name.
///
/// Building and chaining it is free of side effects, only [`MethodCall::invoke`] performs a call.
pub struct MethodCall<'a, I> {
    invoker: &'a I,
    name: String,
}

impl<'a, I: Invoke> MethodCall<'a, I> {
    pub fn new(invoker: &'a I, name: impl Into<String>) -> Self {
        Self {
            invoker,
            name: name.into(),
        }
    }

    /// Returns a new call for the sub-method `{self.name}.{name}`.
    pub fn chain(&self, name: &str) -> MethodCall<'a, I> {
        MethodCall {
            invoker: self.invoker,
            name: format!("{}.{}", self.name, name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Performs the call.
    ///
    /// `args` must serialize to a JSON object, `()` (or any `null`) sends no arguments.
    ///
    /// # Returns
    ///
    /// * `Ok(Node)` - The `result` subtree of the response.
    /// * `Err(RequestError)` - The arguments were invalid, the transport failed or the
    ///   response envelope reported an error.
    pub async fn invoke(self, args: impl Serialize) -> Result<Node, RequestError> {
        let args = into_arguments(&self.name, args)?;
        self.invoker.invoke(&self.name, args).await
    }
}

impl<I> fmt::Debug for MethodCall<'_, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCall")
            .field("name", &self.name)
            .finish()
    }
}

pub(crate) fn into_arguments(
    method: &str,
    args: impl Serialize,
) -> Result<Map<String, Value>, RequestError> {
    let invalid = |message: String| RequestError::InvalidArguments {
        method: method.to_string(),
        message,
    };

    match serde_json::to_value(args).map_err(|e| invalid(e.to_string()))? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(invalid(format!("expected a JSON object, got {other}"))),
    }
}

/// The root of the dynamic API, bound to a transport.
///
/// Cloning is cheap: the transport, the configuration and the file link cache are shared.
pub struct Api<T> {
    pub(crate) transport: Arc<T>,
    pub(crate) config: Arc<ApiConfig>,
    pub(crate) file_links: Arc<FileLinkCache>,
}

impl<T> Clone for Api<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            file_links: Arc::clone(&self.file_links),
        }
    }
}

impl<T> fmt::Debug for Api<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api").field("config", &self.config).finish()
    }
}

impl Api<HttpTransport> {
    /// Creates an API root talking HTTP, as described by `config`.
    pub fn http(config: ApiConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> Api<T> {
    pub fn new(transport: T, config: ApiConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
            file_links: Arc::new(FileLinkCache::new()),
        }
    }

    /// Starts a call chain for the method `name`.
    pub fn method(&self, name: &str) -> MethodCall<'_, Self> {
        MethodCall::new(self, name)
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Invoke for Api<T> {
    async fn invoke(
        &self,
        method: &str,
        mut args: Map<String, Value>,
    ) -> Result<Node, RequestError> {
        for (key, value) in &self.config.predefined_args {
            args.insert(key.clone(), value.clone());
        }

        let traced = !self.config.is_quiet(method);
        if traced {
            tracing::debug!(method, ?args, "calling method");
        }

        let response = self
            .transport
            .call(method, args)
            .await
            .map_err(|source| RequestError::Transport {
                method: method.to_string(),
                source,
            })?;

        if traced {
            tracing::debug!(method, %response, "received answer");
        }

        envelope::unwrap_envelope(method, response)
    }
}
