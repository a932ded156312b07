//! Metric sources
//!
//! A [`MetricsSource`] answers one endpoint at a time with its raw JSON body.
//! Decoding into typed sections happens in [`decode_section`], so alternative
//! sources (tests, replay files) only have to produce JSON.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{instrument, trace};

use crate::snapshot::Endpoint;

use super::error::EndpointFailure;

/// Anything that can answer a metric endpoint
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch the raw body of one endpoint
    ///
    /// Error bodies (`{"error": ...}`) and empty objects are failures, never
    /// successful payloads.
    async fn fetch(&self, endpoint: Endpoint) -> Result<Value, EndpointFailure>;
}

/// HTTP source polling the backend's JSON API
pub struct HttpSource {
    /// HTTP client (reused across requests)
    client: reqwest::Client,

    /// Base URL without trailing slash, e.g. `http://localhost:5000`
    base_url: String,
}

impl HttpSource {
    /// Create a source for `base_url`; requests exceeding `timeout` fail as transport errors
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl MetricsSource for HttpSource {
    #[instrument(skip(self), fields(endpoint = %endpoint))]
    async fn fetch(&self, endpoint: Endpoint) -> Result<Value, EndpointFailure> {
        let url = self.url(endpoint);
        trace!("requesting {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EndpointFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EndpointFailure::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EndpointFailure::Transport(e.to_string()))?;

        let value: Value =
            serde_json::from_str(&body).map_err(|e| EndpointFailure::Malformed(e.to_string()))?;

        check_body(value)
    }
}

/// Reject error bodies and empty objects
pub fn check_body(value: Value) -> Result<Value, EndpointFailure> {
    match &value {
        Value::Object(map) if map.is_empty() => Err(EndpointFailure::Empty),
        Value::Object(map) => match map.get("error") {
            Some(Value::String(message)) => Err(EndpointFailure::Reported(message.clone())),
            Some(other) => Err(EndpointFailure::Reported(other.to_string())),
            None => Ok(value),
        },
        Value::Null => Err(EndpointFailure::Empty),
        _ => Ok(value),
    }
}

/// Decode a raw body into a typed section payload
pub fn decode_section<T: DeserializeOwned>(value: Value) -> Result<T, EndpointFailure> {
    serde_json::from_value(value).map_err(|e| EndpointFailure::Malformed(e.to_string()))
}
