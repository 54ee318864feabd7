//! Backoff policy for transient transport failures.
//!
//! Retried: timeouts, connection failures, 5xx, 408 and 429.
//! Never retried: other 4xx responses and request-building errors.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt)
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::default()
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let initial_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
    }
}

/// Whether a failed attempt is worth repeating
pub fn should_retry_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    if error.is_request() || error.is_builder() {
        return false;
    }
    error.status().is_some_and(should_retry_status)
}

/// Whether a response status is worth repeating the request for
pub fn should_retry_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Run `operation` until it yields a non-retryable outcome or retries run out.
///
/// A response with a retryable status on the last attempt is returned as-is;
/// the caller decides what a non-success status means.
pub async fn with_retry<F, Fut>(config: &RetryConfig, operation: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let outcome = operation().await;
        let retryable = match &outcome {
            Ok(response) => should_retry_status(response.status()),
            Err(e) => should_retry_error(e),
        };

        if !retryable || attempt >= config.max_retries {
            if attempt > 0 && outcome.is_ok() {
                tracing::debug!("Request finished after {} retries", attempt);
            }
            return outcome;
        }

        let delay = config.delay_for_attempt(attempt);
        attempt += 1;
        match &outcome {
            Ok(response) => tracing::warn!(
                "Retryable status {}, retry {} of {} in {:?}",
                response.status(),
                attempt,
                config.max_retries,
                delay
            ),
            Err(e) => tracing::warn!(
                "Retryable error: {}, retry {} of {} in {:?}",
                e,
                attempt,
                config.max_retries,
                delay
            ),
        }
        tokio::time::sleep(delay).await;
    }
}
