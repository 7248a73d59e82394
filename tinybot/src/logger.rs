//! Tracing initialization.

use crate::BoxError;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber.
///
/// The level filter is read from `RUST_LOG` (e.g. `tinybot=debug`) and defaults to `info`.
/// Request and response bodies are traced at `debug`, except for the quiet methods of the
/// [`ApiConfig`](crate::config::ApiConfig).
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing() -> Result<(), BoxError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .try_init()
}
