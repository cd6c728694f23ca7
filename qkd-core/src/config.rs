//! Configuration for the QKD entropy engine

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Engine configuration with validation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Base URL of the QKD key-management service
    pub service_url: String,

    /// Per-request HTTP timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Maximum attempts for the opt-in retry wrapper
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff for the opt-in retry wrapper, in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl EngineConfig {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }

    /// Load configuration from `QKD_`-prefixed environment variables.
    pub fn from_env() -> Result<Self> {
        let config: Self = envy::prefixed("QKD_")
            .from_env()
            .map_err(|e| Error::Config(format!("Failed to parse environment variables: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.parsed_url()?;

        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms must be > 0".to_string()));
        }

        if self.max_retries == 0 {
            return Err(Error::Config("max_retries must be >= 1".to_string()));
        }

        Ok(())
    }

    /// The service URL, parsed
    pub fn parsed_url(&self) -> Result<Url> {
        Url::parse(&self.service_url)
            .map_err(|e| Error::Config(format!("Invalid service_url '{}': {}", self.service_url, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Retry policy for callers that opt into bounded retries
    pub fn retry_policy(&self) -> crate::retry::RetryPolicy {
        crate::retry::RetryPolicy {
            max_attempts: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            ..Default::default()
        }
    }
}

// Default value functions
fn default_request_timeout_ms() -> u64 {
    crate::DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}
