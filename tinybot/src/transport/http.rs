//! # HTTP Transport
//!
//! POSTs the call arguments as a JSON body to the link built from
//! [`ApiConfig::link_pattern`](crate::config::ApiConfig::link_pattern).
//!
//! The response body is decoded as JSON whatever the HTTP status is: the remote service reports
//! failures through the response envelope, usually together with a 4xx status.
//! Errors never include the request URL, since it embeds the bot token.
use super::{Transport, TransportError};
use crate::config::ApiConfig;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpTransport {
    /// Builds a client sending `config.name` as its `User-Agent`.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(config.name.as_str())
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Downloads the raw bytes behind a resolved file link.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| TransportError::Download(e.without_url()))?
            .bytes()
            .await
            .map_err(|e| TransportError::Download(e.without_url()))?;

        Ok(bytes.to_vec())
    }
}

impl Transport for HttpTransport {
    async fn call(&self, method: &str, args: Map<String, Value>) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(self.config.link(method))
            .json(&args)
            .send()
            .await
            .map_err(|e| TransportError::Http {
                method: method.to_string(),
                source: e.without_url(),
            })?;

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode {
                method: method.to_string(),
                source: e.without_url(),
            })
    }
}
