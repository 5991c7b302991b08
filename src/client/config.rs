//! Client configuration: defaults, YAML loading and validation.

use crate::error_code::ErrorKind;
use crate::resilience::backoff::{self, BackoffStrategy};
use crate::resilience::rate_limiter::RateLimiterConfig;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_BATCH_ENDPOINT: &str = "/api/batch";

/// Durations are written as integer milliseconds in config documents.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    #[serde(with = "duration_ms", rename = "base_delay_ms")]
    pub base_delay: Duration,
    /// Kinds the caller allows to be retried; intersected with the kinds that
    /// are retryable at all.
    pub retryable: Vec<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential,
            base_delay: Duration::from_millis(1000),
            retryable: vec![
                ErrorKind::RateLimited,
                ErrorKind::Timeout,
                ErrorKind::NetworkError,
                ErrorKind::InternalError,
            ],
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    pub fn with_base_delay(mut self, d: Duration) -> Self {
        self.base_delay = d;
        self
    }

    pub fn with_retryable(mut self, kinds: Vec<ErrorKind>) -> Self {
        self.retryable = kinds;
        self
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        backoff::delay(attempt, self.backoff, self.base_delay)
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub organization_id: Option<u64>,
    #[serde(with = "duration_ms", rename = "timeout_ms")]
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Maximum cached responses; 0 disables the cache.
    pub cache_size: usize,
    pub enable_batching: bool,
    pub batch_size: usize,
    #[serde(with = "duration_ms", rename = "batch_delay_ms")]
    pub batch_delay: Duration,
    pub batch_endpoint: String,
    pub requests_per_second: Option<f64>,
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            organization_id: None,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            cache_size: 1000,
            enable_batching: false,
            batch_size: 10,
            batch_delay: Duration::from_millis(50),
            batch_endpoint: DEFAULT_BATCH_ENDPOINT.to_string(),
            requests_per_second: None,
            debug: false,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("organization_id", &self.organization_id)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("cache_size", &self.cache_size)
            .field("enable_batching", &self.enable_batching)
            .field("batch_size", &self.batch_size)
            .field("batch_delay", &self.batch_delay)
            .field("batch_endpoint", &self.batch_endpoint)
            .field("requests_per_second", &self.requests_per_second)
            .field("debug", &self.debug)
            .finish()
    }
}

impl ClientConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| {
            Error::validation(
                format!("Invalid client configuration: {}", e),
                ErrorContext::new().with_source("config"),
            )
            .with_cause(e)
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::validation(
                format!("Cannot read configuration file {}: {}", path.display(), e),
                ErrorContext::new().with_source("config"),
            )
            .with_cause(e)
        })?;
        Self::from_yaml_str(&text)
    }

    /// Check invariants that must hold before a client is built.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::missing_credential());
        }
        let config_err = |msg: String| {
            Error::validation(msg, ErrorContext::new().with_source("config"))
        };
        if url::Url::parse(&self.base_url).is_err() {
            return Err(config_err(format!("base_url is not a valid URL: {}", self.base_url)));
        }
        if self.timeout.is_zero() {
            return Err(config_err("timeout must be greater than zero".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(config_err("retry.max_attempts must be at least 1".into()));
        }
        if self.enable_batching && self.batch_size == 0 {
            return Err(config_err("batch_size must be at least 1".into()));
        }
        if let Some(rps) = self.requests_per_second {
            RateLimiterConfig::try_from_rps(rps)?;
        }
        Ok(())
    }
}
