use super::config::ClientConfig;
use super::execution::{Dispatcher, HttpBatchExecutor};
use super::signals::SignalsSnapshot;
use super::types::RequestOptions;
use crate::batch::{can_batch, BatchConfig, RequestBatcher};
use crate::cache::{resource_prefix, should_cache, ttl_for, CacheConfig, CacheManager};
use crate::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
use crate::telemetry::RequestLogger;
use crate::transport::Transport;
use crate::types::OrganizationLimits;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

struct ClientInner {
    config: ClientConfig,
    dispatcher: Arc<Dispatcher>,
    cache: CacheManager,
    batcher: Option<RequestBatcher>,
    limiter: Option<Arc<RateLimiter>>,
    transport_name: &'static str,
}

/// Entry point to the platform API.
///
/// Cheap to clone; clones share the cache, batch queue and rate limiter.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("transport", &self.inner.transport_name)
            .finish()
    }
}

impl Client {
    /// Client configured from the environment (`EVALAI_API_KEY`, ...).
    pub fn from_env() -> Result<Self> {
        super::builder::ClientBuilder::new().build()
    }

    pub fn builder() -> super::builder::ClientBuilder {
        super::builder::ClientBuilder::new()
    }

    /// Assemble a client from an already validated configuration.
    pub(crate) fn from_parts(config: ClientConfig, transport: Arc<dyn Transport>, logger: RequestLogger) -> Self {
        let limiter = config
            .requests_per_second
            .and_then(RateLimiterConfig::from_rps)
            .map(|cfg| Arc::new(RateLimiter::new(cfg)));
        let transport_name = transport.name();
        let dispatcher = Arc::new(Dispatcher::new(&config, transport, limiter.clone(), logger));

        let cache = CacheManager::in_memory(
            CacheConfig::new()
                .with_capacity(config.cache_size)
                .with_enabled(config.cache_size > 0),
        );
        let batcher = config.enable_batching.then(|| {
            RequestBatcher::new(
                BatchConfig::new()
                    .with_max_batch_size(config.batch_size)
                    .with_batch_delay(config.batch_delay),
                Arc::new(HttpBatchExecutor::new(dispatcher.clone(), config.batch_endpoint.clone())),
            )
        });

        Self {
            inner: Arc::new(ClientInner {
                config,
                dispatcher,
                cache,
                batcher,
                limiter,
                transport_name,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn organization_id(&self) -> Option<u64> {
        self.inner.config.organization_id
    }

    pub fn logger(&self) -> &RequestLogger {
        self.inner.dispatcher.logger()
    }

    pub fn cache(&self) -> &CacheManager {
        &self.inner.cache
    }

    /// `explicit` if given, else the configured default organization.
    pub fn require_organization(&self, explicit: Option<u64>) -> Result<u64> {
        explicit
            .or(self.inner.config.organization_id)
            .ok_or_else(Error::missing_organization)
    }

    /// Issue a request against `endpoint` (path plus optional query string)
    /// and decode the JSON body into `T`.
    pub async fn request<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<T> {
        let value = self.request_value(endpoint, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn request_value(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        let inner = &self.inner;
        let method = options.method;
        let cacheable = inner.cache.is_enabled() && should_cache(method.as_str(), endpoint);
        let params = options.body.as_ref();

        if cacheable {
            match inner.cache.get::<Value>(method.as_str(), endpoint, params).await {
                Ok(Some(hit)) => return Ok(hit),
                Ok(None) => {}
                Err(e) => warn!(endpoint, error = %e, "cache read failed"),
            }
        }

        let value = match &inner.batcher {
            Some(batcher) if can_batch(method, endpoint) => {
                batcher
                    .enqueue(method, endpoint, options.body.clone(), options.headers.clone())
                    .await?
            }
            _ => {
                inner
                    .dispatcher
                    .send_with_retry(method, endpoint, options.body.as_ref(), &options.headers)
                    .await?
            }
        };

        if cacheable {
            if let Err(e) = inner
                .cache
                .set(method.as_str(), endpoint, &value, Some(ttl_for(endpoint)), params)
                .await
            {
                warn!(endpoint, error = %e, "cache write failed");
            }
        } else if method.is_mutation() {
            if let Err(e) = inner.cache.invalidate_pattern(&resource_prefix(endpoint)).await {
                warn!(endpoint, error = %e, "cache invalidation failed");
            }
        }
        Ok(value)
    }

    /// Dispatch every queued batch item now.
    pub async fn flush_batches(&self) {
        if let Some(b) = &self.inner.batcher {
            b.flush().await;
        }
    }

    pub async fn clear_cache(&self) -> Result<()> {
        self.inner.cache.clear().await
    }

    /// Snapshot current runtime signals (facts only).
    pub async fn signals(&self) -> SignalsSnapshot {
        let rate_limiter = match &self.inner.limiter {
            Some(rl) => Some(rl.snapshot().await),
            None => None,
        };
        SignalsSnapshot {
            cache: self.inner.cache.stats().await,
            rate_limiter,
            batch: self.inner.batcher.as_ref().map(RequestBatcher::stats),
        }
    }

    pub async fn organization_limits(&self, organization_id: Option<u64>) -> Result<OrganizationLimits> {
        let org = self.require_organization(organization_id)?;
        self.request(&format!("/api/organizations/{}/limits", org), RequestOptions::get())
            .await
    }

    pub fn traces(&self) -> crate::resources::Traces<'_> {
        crate::resources::Traces::new(self)
    }

    pub fn evaluations(&self) -> crate::resources::Evaluations<'_> {
        crate::resources::Evaluations::new(self)
    }

    pub fn llm_judge(&self) -> crate::resources::LlmJudge<'_> {
        crate::resources::LlmJudge::new(self)
    }

    pub fn annotations(&self) -> crate::resources::Annotations<'_> {
        crate::resources::Annotations::new(self)
    }

    pub fn developer(&self) -> crate::resources::Developer<'_> {
        crate::resources::Developer::new(self)
    }

    pub fn organizations(&self) -> crate::resources::Organizations<'_> {
        crate::resources::Organizations::new(self)
    }
}
