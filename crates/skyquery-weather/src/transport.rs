//! Network side of a query: one GET per cache miss.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use skyquery_core::{config::EndpointConfig, ConfigError};

use crate::retry::{with_retry, RetryConfig};

const USER_AGENT: &str = concat!("SkyQuery/", env!("CARGO_PKG_VERSION"));

/// Why a request produced no body.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server returned status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::Status(status.as_u16())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Sends a query string to the remote service and returns the raw body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, query: &str) -> Result<String, TransportError>;
}

/// Transport settings
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::from(&EndpointConfig::default())
    }
}

impl From<&EndpointConfig> for TransportConfig {
    fn from(endpoint: &EndpointConfig) -> Self {
        Self {
            base_url: endpoint.base_url.clone(),
            timeout: Duration::from_secs(endpoint.timeout_secs),
            retry: RetryConfig {
                max_retries: endpoint.max_retries,
                ..RetryConfig::default()
            },
        }
    }
}

/// HTTP transport for a YQL-style endpoint.
#[derive(Debug, Clone)]
pub struct YqlTransport {
    client: Client,
    base_url: Url,
    retry: RetryConfig,
}

impl YqlTransport {
    /// # Errors
    /// Returns `ConfigError::Invalid` for an unusable base URL or HTTP client setup.
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::Invalid(format!("endpoint URL {}: {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            retry: config.retry,
        })
    }

    /// Full request URL: base endpoint plus the encoded query and output format.
    pub fn request_url(&self, query: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("q", query)
            .append_pair("format", "json");
        url
    }
}

#[async_trait]
impl Transport for YqlTransport {
    #[instrument(skip(self), level = "info")]
    async fn fetch(&self, query: &str) -> Result<String, TransportError> {
        let url = self.request_url(query);

        let response = with_retry(&self.retry, || self.client.get(url.clone()).send()).await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Weather service returned status {}", status);
            return Err(TransportError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
