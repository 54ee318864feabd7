//! Error types shared by the SkyQuery crates.
//!
//! The hierarchy mirrors the lifecycle of a query:
//! - `ConfigError` is raised while wiring things up (fatal, fail-fast)
//! - `CacheError` covers I/O against an already-validated cache medium
//! - `ResponseError` covers everything between "send the request" and
//!   "got a usable results envelope"

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error returned by the query service.
///
/// Use `user_message()` to get a message suitable for display.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl WeatherError {
    /// Returns a short, non-technical message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Config(e) => e.user_message(),
            WeatherError::Response(e) => e.user_message(),
            WeatherError::Cache(e) => e.user_message(),
        }
    }

    /// Whether repeating the same request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WeatherError::Response(ResponseError::Unreachable(_)))
    }
}

/// Configuration errors, raised before any query is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cache directory is not readable: {}", .0.display())]
    NotReadable(PathBuf),

    #[error("Cache directory is not writable: {}", .0.display())]
    NotWritable(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) | ConfigError::NotADirectory(_) => {
                "Cache directory is missing. Check your settings."
            }
            ConfigError::NotReadable(_) | ConfigError::NotWritable(_) => {
                "Cache directory is not accessible. Check its permissions."
            }
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Errors produced while obtaining a results envelope from the service.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The request never produced a body (connect failure, timeout, non-2xx).
    #[error("Weather service unreachable: {0}")]
    Unreachable(String),

    /// The body was not a JSON object.
    #[error("Invalid endpoint response: {0}")]
    InvalidResponse(String),

    /// The envelope parsed but `query.results` was absent or null.
    #[error("No weather service response. Check if the service is reachable.")]
    NoResults,
}

impl ResponseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ResponseError::Unreachable(_) => {
                "Weather service unavailable. Please try again later."
            }
            ResponseError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
            ResponseError::NoResults => "No weather data found for this request.",
        }
    }
}

/// Errors reading or writing cache records.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache task failed: {0}")]
    Task(String),
}

impl CacheError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            CacheError::Io { .. } => "A cache file operation failed. Please try again.",
            CacheError::Serialization(_) => "Cached data could not be saved.",
            CacheError::Task(_) => "Something went wrong. Please try again.",
        }
    }
}
