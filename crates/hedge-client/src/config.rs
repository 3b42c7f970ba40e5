//! Configuration for the hedge fund client

use crate::error::{ClientError, Result};
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const DEFAULT_API_BASE: &str = "http://localhost:8000";
const DEFAULT_RUN_PATH: &str = "/hedge-fund/run";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration shared by the streaming client and the REST wrappers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend (default: "http://localhost:8000")
    pub base_url: String,

    /// Path of the streaming run endpoint, relative to `base_url`
    pub run_path: String,

    /// Timeout for plain REST requests. Streaming runs have no total timeout.
    pub request_timeout: Duration,

    /// Timeout for establishing a connection
    pub connect_timeout: Duration,

    /// Extra headers sent with every request
    pub headers: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            run_path: DEFAULT_RUN_PATH.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Create config from environment variables
    ///
    /// Reads the base URL from `HEDGE_API_BASE` and the REST timeout from
    /// `HEDGE_REQUEST_TIMEOUT_SECS`; both fall back to defaults when unset.
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url).map_err(|e| {
            ClientError::Config(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;

        if self.request_timeout.is_zero() {
            return Err(ClientError::Config(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(ClientError::Config(
                "connect_timeout must be greater than 0".to_string(),
            ));
        }

        for (key, value) in &self.headers {
            HeaderName::from_str(key).map_err(|e| {
                ClientError::Config(format!("Invalid header name '{}': {}", key, e))
            })?;
            HeaderValue::from_str(value).map_err(|e| {
                ClientError::Config(format!("Invalid header value for '{}': {}", key, e))
            })?;
        }

        Ok(())
    }

    /// Resolve a path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| ClientError::Config(format!("Invalid endpoint '{}': {}", joined, e)))
    }

    /// URL of the streaming run endpoint
    pub fn run_url(&self) -> Result<Url> {
        self.endpoint(&self.run_path)
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    run_path: Option<String>,
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    headers: HashMap<String, String>,
}

impl ClientConfigBuilder {
    /// Set the backend base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the streaming run path
    pub fn run_path(mut self, path: impl Into<String>) -> Self {
        self.run_path = Some(path.into());
        self
    }

    /// Set the REST request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Add a header sent with every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Fill unset values from `HEDGE_API_BASE` and `HEDGE_REQUEST_TIMEOUT_SECS`
    pub fn with_env(mut self) -> Self {
        if self.base_url.is_none() {
            if let Ok(base) = std::env::var("HEDGE_API_BASE") {
                self.base_url = Some(base);
            }
        }
        if self.request_timeout.is_none() {
            if let Some(secs) = std::env::var("HEDGE_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
            {
                self.request_timeout = Some(Duration::from_secs(secs));
            }
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let config = ClientConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            run_path: self.run_path.unwrap_or(defaults.run_path),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            headers: self.headers,
        };

        config.validate()?;
        Ok(config)
    }
}
