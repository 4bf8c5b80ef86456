//! Configuration types
//!
//! Two pieces of configuration drive a run: the target rate handed to the
//! limiter (from the command line) and the API client settings (from the
//! `ApiClient` section of a JSON settings file).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Settings file read when `HTTP_LOADGEN_SETTINGS` is not set
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";

/// Environment variable overriding the settings file location
pub const SETTINGS_ENV_VAR: &str = "HTTP_LOADGEN_SETTINGS";

/// Name of the settings section holding [`ApiClientConfig`]
pub const API_CLIENT_SECTION: &str = "ApiClient";

/// Smallest renewal interval the limiter may choose.
///
/// Must not be shorter than the slowest expected round-trip, or a worker
/// can exhaust the window budget while its request is still in flight.
pub const DEFAULT_TIME_QUANTUM: Duration = Duration::from_millis(1200);

/// Name sent in every request payload unless configured otherwise
pub const DEFAULT_REQUEST_NAME: &str = "http-loadgen";

/// Settings for the API under test
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiClientConfig {
    /// Scheme and host of the API, e.g. `https://api.example.com`
    pub endpoint_base_url: Option<String>,

    /// Path POSTed to, relative to the base URL
    pub endpoint_url_path: Option<String>,

    /// Header carrying the API key
    pub auth_key_name: Option<String>,

    /// API key value
    pub auth_key_value: Option<String>,

    /// `name` field of every request payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_name: Option<String>,

    /// Per-request timeout applied by the HTTP client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ApiClientConfig {
    /// Load the `ApiClient` section from a JSON settings file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse the `ApiClient` section out of a settings document
    pub fn from_json(text: &str) -> std::result::Result<Self, ConfigError> {
        let mut root: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let section = root
            .get_mut(API_CLIENT_SECTION)
            .map(serde_json::Value::take)
            .ok_or(ConfigError::MissingSection(API_CLIENT_SECTION))?;

        serde_json::from_value(section).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolve the settings path from the environment, falling back to
    /// `appsettings.json` in the working directory
    pub fn settings_path() -> PathBuf {
        std::env::var_os(SETTINGS_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }

    /// Validate the configuration
    ///
    /// Every connection field must be present and non-blank, and the base
    /// URL must parse.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let base = required(&self.endpoint_base_url, "API base URL")?;
        required(&self.endpoint_url_path, "API URL path")?;
        required(&self.auth_key_name, "API authorization key name")?;
        required(&self.auth_key_value, "API authorization key value")?;

        url::Url::parse(base).map_err(|e| ConfigError::InvalidUrl(format!("{base}: {e}")))?;

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }

    /// Full endpoint URL: base URL joined with the URL path
    pub fn endpoint_url(&self) -> std::result::Result<url::Url, ConfigError> {
        let base = required(&self.endpoint_base_url, "API base URL")?;
        let path = required(&self.endpoint_url_path, "API URL path")?;
        url::Url::parse(base)
            .and_then(|b| b.join(path))
            .map_err(|e| ConfigError::InvalidUrl(format!("{base} + {path}: {e}")))
    }

    /// Name placed in every request payload
    pub fn request_name(&self) -> &str {
        self.request_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_REQUEST_NAME)
    }

    /// Per-request timeout, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn required<'a>(
    value: &'a Option<String>,
    label: &'static str,
) -> std::result::Result<&'a str, ConfigError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField(label)),
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Requests per second to sustain
    pub target_rate: f64,

    /// Smallest renewal interval; candidates are 1..=7 multiples of it
    pub time_quantum: Duration,
}

impl LimiterConfig {
    /// Create a config for the given target rate with the default quantum
    pub fn new(target_rate: f64) -> Self {
        Self {
            target_rate,
            time_quantum: DEFAULT_TIME_QUANTUM,
        }
    }

    /// Override the time quantum
    pub fn with_time_quantum(mut self, quantum: Duration) -> Self {
        self.time_quantum = quantum;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.target_rate.is_finite() || self.target_rate <= 0.0 {
            return Err(Error::InvalidTargetRate(self.target_rate));
        }
        if self.time_quantum.is_zero() {
            return Err(Error::config("time quantum must be non-zero"));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is missing or blank
    #[error("{0} has not been configured")]
    MissingField(&'static str),

    /// The settings document has no `ApiClient` section
    #[error("settings have no `{0}` section")]
    MissingSection(&'static str),

    /// The settings document is not valid JSON or has wrong field types
    #[error("could not parse settings: {0}")]
    Parse(String),

    /// The endpoint URL cannot be built
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Timeout set to zero
    #[error("request timeout must be at least one second")]
    InvalidTimeout,
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
