//! # API Configuration
//!
//! [`ApiConfig`] describes how to reach the remote service: link patterns, credentials,
//! arguments sent with every call, and the methods that should not be traced.
//!
//! It can be built in code, deserialized from any serde format (missing fields take their
//! default values), or read from the environment with [`ApiConfig::from_env`].
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{collections::HashSet, fmt, time::Duration};

pub const DEFAULT_LINK_PATTERN: &str = "https://api.telegram.org/bot{token}/{method}";
pub const DEFAULT_FILE_LINK_PATTERN: &str = "https://api.telegram.org/file/bot{token}/{file_path}";

const TOKEN_PLACEHOLDER: &str = "{token}";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable '{0}'")]
    MissingVar(&'static str),
    #[error("Invalid value '{value}' for '{name}': {message}")]
    InvalidVar {
        name: &'static str,
        value: String,
        message: String,
    },
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Sent as the `User-Agent` header.
    pub name: String,
    /// URL of a call, with `{token}` and `{method}` placeholders.
    pub link_pattern: String,
    /// URL of a downloadable file, with `{token}` and `{file_path}` placeholders.
    pub file_link_pattern: String,
    /// Only used to fill the `{token}` placeholder, which is left as is when unset.
    pub token: Option<String>,
    /// Merged into the arguments of every call, overriding caller supplied keys.
    pub predefined_args: Map<String, Value>,
    /// Methods whose requests and responses are not traced, e.g. long polling.
    pub quiet_methods: HashSet<String>,
    pub timeout_secs: u64,
    /// File links stay valid for at least one hour on the remote side.
    pub file_link_ttl_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            name: concat!("tinybot/", env!("CARGO_PKG_VERSION")).to_string(),
            link_pattern: DEFAULT_LINK_PATTERN.to_string(),
            file_link_pattern: DEFAULT_FILE_LINK_PATTERN.to_string(),
            token: None,
            predefined_args: Map::new(),
            quiet_methods: HashSet::from(["getUpdates".to_string()]),
            timeout_secs: 60,
            file_link_ttl_secs: 3600,
        }
    }
}

impl ApiConfig {
    /// Configuration for the Telegram Bot API with the given bot name and token.
    pub fn telegram(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Reads the configuration from the environment.
    ///
    /// * `TINYBOT_TOKEN` (required)
    /// * `TINYBOT_NAME`
    /// * `TINYBOT_LINK_PATTERN`
    /// * `TINYBOT_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self {
            token: Some(lookup("TINYBOT_TOKEN").ok_or(ConfigError::MissingVar("TINYBOT_TOKEN"))?),
            ..Self::default()
        };

        if let Some(name) = lookup("TINYBOT_NAME") {
            config.name = name;
        }
        if let Some(pattern) = lookup("TINYBOT_LINK_PATTERN") {
            config.link_pattern = pattern;
        }
        if let Some(timeout) = lookup("TINYBOT_TIMEOUT_SECS") {
            config.timeout_secs = timeout.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidVar {
                    name: "TINYBOT_TIMEOUT_SECS",
                    value: timeout.clone(),
                    message: e.to_string(),
                }
            })?;
        }

        Ok(config)
    }

    pub fn with_predefined_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predefined_args.insert(key.into(), value.into());
        self
    }

    pub fn with_quiet_method(mut self, method: impl Into<String>) -> Self {
        self.quiet_methods.insert(method.into());
        self
    }

    pub fn is_quiet(&self, method: &str) -> bool {
        self.quiet_methods.contains(method)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn file_link_ttl(&self) -> Duration {
        Duration::from_secs(self.file_link_ttl_secs)
    }

    /// The URL of a call to `method`.
    pub fn link(&self, method: &str) -> String {
        self.link_pattern
            .replace("{method}", method)
            .replace(TOKEN_PLACEHOLDER, self.token())
    }

    /// The download URL of a file, given the `file_path` returned by `getFile`.
    pub fn file_link(&self, file_path: &str) -> String {
        self.file_link_pattern
            .replace("{file_path}", file_path)
            .replace(TOKEN_PLACEHOLDER, self.token())
    }

    fn token(&self) -> &str {
        self.token.as_deref().unwrap_or(TOKEN_PLACEHOLDER)
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("name", &self.name)
            .field("link_pattern", &self.link_pattern)
            .field("file_link_pattern", &self.file_link_pattern)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("predefined_args", &self.predefined_args)
            .field("quiet_methods", &self.quiet_methods)
            .field("timeout_secs", &self.timeout_secs)
            .field("file_link_ttl_secs", &self.file_link_ttl_secs)
            .finish()
    }
}
