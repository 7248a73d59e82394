//! # tinybot
//!
//! `tinybot` talks to JSON APIs without declaring their schema, and runs Telegram-style
//! bot update dispatch on top of it.
//!
//! ## Key Components
//!
//! * **[`view::Node`] & [`view::View`]:** Lazy, path-tracking views over decoded JSON. Scalars are
//!   returned raw, mappings and sequences stay navigable, and every missing field or shape
//!   mismatch is reported with the exact access path (e.g. `.message.chat.id`).
//! * **[`api::Api`] & [`api::MethodCall`]:** A dynamic call builder. `api.method("sendMessage")`
//!   remembers a method name, `.invoke(args)` performs the call and validates the
//!   `{ok, result|description}` response envelope.
//! * **[`api::retry::Retrying`] & [`api::blocking::Blocking`]:** Invoker decorators retrying
//!   failed calls and running calls from synchronous code.
//! * **[`dispatch::Dispatcher`]:** Routes the populated field of an update to its handler and
//!   isolates handler failures.
//!
//! ## Transport
//!
//! The network is behind the [`transport::Transport`] trait. [`transport::http::HttpTransport`]
//! implements it with `reqwest`.
//!
//! See the README.md for more details about usage.
pub mod api;
pub mod config;
pub mod dispatch;
pub mod files;
pub mod logger;
pub mod transport;
pub mod view;

pub use api::{Api, Invoke, MethodCall, RequestError};
pub use config::ApiConfig;
pub use view::{Node, View, ViewError};

// Re-exports
pub use serde_json;

/// Type alias for the standard boxed error used in generic bounds.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
