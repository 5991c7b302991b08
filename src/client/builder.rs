use super::config::{ClientConfig, RetryPolicy};
use super::core::Client;
use crate::error_code::ErrorKind;
use crate::telemetry::{Logger, RequestLogger};
use crate::transport::{HttpTransport, Transport};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating clients with custom configuration.
///
/// Precedence for each setting: explicit builder call, then environment
/// variable, then the base configuration (defaults or [`from_config`](Self::from_config)).
///
/// Environment:
/// - `EVALAI_API_KEY` / `AI_EVAL_API_KEY`
/// - `EVALAI_ORGANIZATION_ID` / `AI_EVAL_ORGANIZATION_ID`
/// - `EVALAI_BASE_URL`
/// - `EVALAI_TIMEOUT_MS`
/// - `EVALAI_RPS` (requests per second)
/// - `EVALAI_DEBUG` (`1` or `true`)
pub struct ClientBuilder {
    base: ClientConfig,
    api_key: Option<String>,
    organization_id: Option<u64>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    requests_per_second: Option<f64>,
    debug: Option<bool>,
    use_env: bool,
    transport: Option<Arc<dyn Transport>>,
    logger: Option<Logger>,
}

fn env_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| std::env::var(n).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    /// Start from a full configuration, e.g. one loaded from YAML.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            base: config,
            api_key: None,
            organization_id: None,
            base_url: None,
            timeout: None,
            requests_per_second: None,
            debug: None,
            use_env: true,
            transport: None,
            logger: None,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn organization_id(mut self, id: u64) -> Self {
        self.organization_id = Some(id);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.base.retry = policy;
        self
    }

    /// Maximum cached responses; 0 disables caching.
    pub fn cache_size(mut self, n: usize) -> Self {
        self.base.cache_size = n;
        self
    }

    pub fn enable_batching(mut self, enable: bool) -> Self {
        self.base.enable_batching = enable;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.base.batch_size = n.max(1);
        self
    }

    pub fn batch_delay(mut self, delay: Duration) -> Self {
        self.base.batch_delay = delay;
        self
    }

    pub fn batch_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.base.batch_endpoint = endpoint.into();
        self
    }

    /// Queue requests so that at most `rps` leave per second. Invalid rates
    /// fail at [`build`](Self::build).
    pub fn rate_limit_rps(mut self, rps: f64) -> Self {
        self.requests_per_second = Some(rps);
        self
    }

    pub fn debug(mut self, enable: bool) -> Self {
        self.debug = Some(enable);
        self
    }

    /// Skip environment lookups entirely.
    pub fn use_env(mut self, enable: bool) -> Self {
        self.use_env = enable;
        self
    }

    /// Replace the HTTP transport (mock servers, custom stacks).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attach a logger instead of the one derived from the debug flag.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Resolve the final configuration without building a client.
    pub fn resolve_config(&self) -> ClientConfig {
        let env = |names: &[&str]| if self.use_env { env_var(names) } else { None };
        let mut cfg = self.base.clone();

        if let Some(key) = self.api_key.clone().or_else(|| env(&["EVALAI_API_KEY", "AI_EVAL_API_KEY"])) {
            cfg.api_key = key;
        }
        if let Some(org) = self.organization_id.or_else(|| {
            env(&["EVALAI_ORGANIZATION_ID", "AI_EVAL_ORGANIZATION_ID"])?.parse().ok()
        }) {
            cfg.organization_id = Some(org);
        }
        if let Some(url) = self.base_url.clone().or_else(|| env(&["EVALAI_BASE_URL"])) {
            cfg.base_url = url;
        }
        if let Some(t) = self.timeout.or_else(|| {
            env(&["EVALAI_TIMEOUT_MS"])?.parse::<u64>().ok().map(Duration::from_millis)
        }) {
            cfg.timeout = t;
        }
        if let Some(rps) = self
            .requests_per_second
            .or_else(|| env(&["EVALAI_RPS"])?.parse::<f64>().ok())
        {
            cfg.requests_per_second = Some(rps);
        }
        if let Some(d) = self
            .debug
            .or_else(|| env(&["EVALAI_DEBUG"]).map(|v| v == "1" || v.eq_ignore_ascii_case("true")))
        {
            cfg.debug = d;
        }
        cfg
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let config = self.resolve_config();
        config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new().map_err(|e| {
                Error::new(ErrorKind::Unknown, format!("Failed to create HTTP client: {}", e))
                    .with_context(ErrorContext::new().with_source("transport"))
                    .with_cause(e)
            })?),
        };
        let logger = match self.logger {
            Some(l) => RequestLogger::new(l),
            None => RequestLogger::for_client(config.debug),
        };
        Ok(Client::from_parts(config, transport, logger))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_fails() {
        let err = ClientBuilder::new().use_env(false).build().unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredential);
    }

    #[test]
    fn test_explicit_values_win() {
        let cfg = ClientBuilder::new()
            .use_env(false)
            .api_key("k")
            .organization_id(7)
            .base_url("https://eval.example.com")
            .timeout(Duration::from_millis(500))
            .rate_limit_rps(2.0)
            .debug(true)
            .resolve_config();
        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.organization_id, Some(7));
        assert_eq!(cfg.base_url, "https://eval.example.com");
        assert_eq!(cfg.timeout, Duration::from_millis(500));
        assert_eq!(cfg.requests_per_second, Some(2.0));
        assert!(cfg.debug);
    }

    #[test]
    fn test_from_config_keeps_base() {
        let base = ClientConfig { api_key: "from-yaml".into(), cache_size: 3, ..Default::default() };
        let cfg = ClientBuilder::from_config(base).use_env(false).batch_size(0).resolve_config();
        assert_eq!(cfg.api_key, "from-yaml");
        assert_eq!(cfg.cache_size, 3);
        assert_eq!(cfg.batch_size, 1);
    }

    #[test]
    fn test_invalid_rps_fails_at_build() {
        let err = ClientBuilder::new().use_env(false).api_key("k").rate_limit_rps(-1.0).build().unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
    }
}
