//! Configuration management for the search box.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The binary calls `dotenvy::dotenv()` first, so a `.env` file works too.
//!
//! | variable | default |
//! |---|---|
//! | `SEARCHBOX_ENDPOINT` | `https://hn.algolia.com/api/v1/search` |
//! | `SEARCHBOX_TIMEOUT_SECS` | `10` |
//! | `SEARCHBOX_METRICS_ADDR` | unset (no exporter) |
//! | `SEARCHBOX_OUTPUT` | `text` (`text` or `json`) |

use crate::render::OutputFormat;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Default upstream search endpoint
pub const DEFAULT_ENDPOINT: &str = "https://hn.algolia.com/api/v1/search";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set to a value that cannot be used
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Search box configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Upstream search endpoint (http or https)
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Where to expose Prometheus metrics, if anywhere
    pub metrics_addr: Option<SocketAddr>,
    /// How the CLI prints states
    pub output: OutputFormat,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            metrics_addr: None,
            output: OutputFormat::Text,
        }
    }
}

impl SearchConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if any variable is set but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if any variable is set but unusable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let endpoint = match lookup("SEARCHBOX_ENDPOINT") {
            Some(value) if value.starts_with("http://") || value.starts_with("https://") => value,
            Some(value) => {
                return Err(ConfigError::InvalidValue {
                    var: "SEARCHBOX_ENDPOINT",
                    value,
                    reason: "must start with http:// or https://".to_string(),
                });
            },
            None => defaults.endpoint,
        };

        let timeout = match lookup("SEARCHBOX_TIMEOUT_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError::InvalidValue {
                        var: "SEARCHBOX_TIMEOUT_SECS",
                        value,
                        reason: "must be greater than zero".to_string(),
                    });
                },
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        var: "SEARCHBOX_TIMEOUT_SECS",
                        value,
                        reason: e.to_string(),
                    });
                },
            },
            None => defaults.timeout,
        };

        let metrics_addr = match lookup("SEARCHBOX_METRICS_ADDR") {
            Some(value) => match value.parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        var: "SEARCHBOX_METRICS_ADDR",
                        value,
                        reason: e.to_string(),
                    });
                },
            },
            None => defaults.metrics_addr,
        };

        let output = match lookup("SEARCHBOX_OUTPUT") {
            Some(value) => match value.to_lowercase().as_str() {
                "text" => OutputFormat::Text,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "SEARCHBOX_OUTPUT",
                        value,
                        reason: "expected text or json".to_string(),
                    });
                },
            },
            None => defaults.output,
        };

        Ok(Self {
            endpoint,
            timeout,
            metrics_addr,
            output,
        })
    }
}
