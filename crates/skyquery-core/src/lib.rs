pub mod config;
pub mod error;

pub use config::{CacheConfig, Config, EndpointConfig, ValidationResult};
pub use error::{CacheError, ConfigError, ResponseError, WeatherError};

use anyhow::Result;

/// Initialize logging for the process
///
/// Logs go to stderr; stdout is reserved for command output.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::debug!("SkyQuery core initialized");
    Ok(())
}
