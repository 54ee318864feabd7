use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default base URL of the YQL endpoint
pub const DEFAULT_BASE_URL: &str = "http://query.yahooapis.com/v1/public/yql";

/// Default cache time-to-live in seconds
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Remote endpoint settings
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Default units flag ("c" or "f")
    #[serde(default = "default_units")]
    pub units: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one file per cached query
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Time-to-live applied to every entry, in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL the query parameters are appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient transport failures (0 = single attempt)
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

fn default_units() -> String {
    "c".to_string()
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skyquery")
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            endpoint: EndpointConfig::default(),
            units: default_units(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load configuration from `path`, writing defaults there if the file is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors. Warnings are logged.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.endpoint.base_url, "endpoint.base_url", &mut result);

        if self.endpoint.timeout_secs == 0 {
            result.add_error("endpoint.timeout_secs", "Timeout must be greater than 0");
        }

        if self.endpoint.max_retries > 10 {
            result.add_warning(
                "endpoint.max_retries",
                "More than 10 retries may stall callers for a long time",
            );
        }

        if self.cache.ttl_secs == 0 {
            result.add_warning(
                "cache.ttl_secs",
                "Cache TTL is 0, every entry is stale immediately",
            );
        }

        if self.cache.dir.as_os_str().is_empty() {
            result.add_error("cache.dir", "Cache directory must not be empty");
        }

        if !self.units.eq_ignore_ascii_case("c") && !self.units.eq_ignore_ascii_case("f") {
            result.add_error(
                "units",
                format!("Units must be \"c\" or \"f\", got: {}", self.units),
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.query().is_some() {
                    result.add_warning(
                        field_name,
                        "URL query string will be replaced by the request parameters",
                    );
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the default configuration file
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skyquery");

        Ok(config_dir.join("config.toml"))
    }
}
