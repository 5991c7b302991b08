//! Cache manager.

use super::backend::CacheBackend;
use super::key::CacheKey;
use super::policy::CacheTtl;
use crate::Result;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CacheConfig { pub capacity: usize, pub default_ttl: Duration, pub enabled: bool }

impl Default for CacheConfig {
    fn default() -> Self { Self { capacity: 1000, default_ttl: CacheTtl::MEDIUM, enabled: true } }
}

impl CacheConfig {
    pub fn new() -> Self { Self::default() }
    pub fn with_capacity(mut self, capacity: usize) -> Self { self.capacity = capacity; self }
    pub fn with_ttl(mut self, ttl: Duration) -> Self { self.default_ttl = ttl; self }
    pub fn with_enabled(mut self, enabled: bool) -> Self { self.enabled = enabled; self }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats { pub hits: u64, pub misses: u64, pub sets: u64, pub invalidations: u64, pub errors: u64, pub size: usize, pub capacity: usize }

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 { let total = self.hits + self.misses; if total == 0 { 0.0 } else { self.hits as f64 / total as f64 } }
}

struct AtomicStats { hits: AtomicU64, misses: AtomicU64, sets: AtomicU64, invalidations: AtomicU64, errors: AtomicU64 }
impl AtomicStats {
    fn new() -> Self { Self { hits: AtomicU64::new(0), misses: AtomicU64::new(0), sets: AtomicU64::new(0), invalidations: AtomicU64::new(0), errors: AtomicU64::new(0) } }
    fn bump(counter: &AtomicU64, n: u64) { counter.fetch_add(n, Ordering::Relaxed); }
}

/// Response cache keyed by request method, endpoint and parameters.
///
/// Values are stored as serialized JSON so any backend can hold them.
pub struct CacheManager { config: CacheConfig, backend: Box<dyn CacheBackend>, stats: AtomicStats }

impl CacheManager {
    pub fn new(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self { Self { config, backend, stats: AtomicStats::new() } }

    /// Memory-backed manager; a capacity of zero disables storage.
    pub fn in_memory(config: CacheConfig) -> Self {
        let backend: Box<dyn CacheBackend> = if config.capacity == 0 { Box::new(super::NullCache::new()) } else { Box::new(super::MemoryCache::new(config.capacity)) };
        Self::new(config, backend)
    }

    pub fn is_enabled(&self) -> bool { self.config.enabled && self.backend.capacity() > 0 }

    pub async fn get<T: DeserializeOwned>(&self, method: &str, url: &str, params: Option<&Value>) -> Result<Option<T>> {
        if !self.config.enabled { return Ok(None); }
        let key = CacheKey::new(method, url, params);
        match self.backend.get(&key).await {
            Ok(Some(data)) => match serde_json::from_slice(&data) {
                Ok(val) => { AtomicStats::bump(&self.stats.hits, 1); debug!(key = key.as_str(), "cache hit"); Ok(Some(val)) }
                Err(_) => { AtomicStats::bump(&self.stats.errors, 1); AtomicStats::bump(&self.stats.misses, 1); Ok(None) }
            },
            Ok(None) => { AtomicStats::bump(&self.stats.misses, 1); Ok(None) }
            Err(e) => { AtomicStats::bump(&self.stats.errors, 1); Err(e) }
        }
    }

    /// Store `value`; `ttl` falls back to the configured default.
    pub async fn set<T: Serialize>(&self, method: &str, url: &str, value: &T, ttl: Option<Duration>, params: Option<&Value>) -> Result<()> {
        if !self.config.enabled { return Ok(()); }
        let data = serde_json::to_vec(value)?;
        let key = CacheKey::new(method, url, params);
        match self.backend.set(&key, &data, ttl.unwrap_or(self.config.default_ttl)).await {
            Ok(()) => { AtomicStats::bump(&self.stats.sets, 1); Ok(()) }
            Err(e) => { AtomicStats::bump(&self.stats.errors, 1); Err(e) }
        }
    }

    pub async fn invalidate(&self, method: &str, url: &str, params: Option<&Value>) -> Result<bool> {
        let removed = self.backend.delete(&CacheKey::new(method, url, params)).await?;
        if removed { AtomicStats::bump(&self.stats.invalidations, 1); }
        Ok(removed)
    }

    /// Drop every entry whose key contains `pattern`.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let removed = self.backend.delete_matching(pattern).await?;
        AtomicStats::bump(&self.stats.invalidations, removed as u64);
        if removed > 0 { debug!(pattern, removed, "cache entries invalidated"); }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> { self.backend.clear().await }

    pub async fn stats(&self) -> CacheStats {
        let s = &self.stats;
        CacheStats {
            hits: s.hits.load(Ordering::Relaxed),
            misses: s.misses.load(Ordering::Relaxed),
            sets: s.sets.load(Ordering::Relaxed),
            invalidations: s.invalidations.load(Ordering::Relaxed),
            errors: s.errors.load(Ordering::Relaxed),
            size: self.backend.len().await.unwrap_or(0),
            capacity: self.backend.capacity(),
        }
    }

    pub fn backend_name(&self) -> &'static str { self.backend.name() }
}
