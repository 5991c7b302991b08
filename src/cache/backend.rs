//! Cache backend implementations.

use super::key::CacheKey;
use crate::Result;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone)]
struct CacheEntry {
    data: Vec<u8>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            created_at: Instant::now(),
            ttl,
        }
    }
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    /// Remove every entry whose key contains `pattern`; returns the count removed.
    async fn delete_matching(&self, pattern: &str) -> Result<usize>;
    async fn clear(&self) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    fn capacity(&self) -> usize;
    fn name(&self) -> &'static str;
}

/// Bounded in-memory store with first-in-first-out eviction.
///
/// Reads only peek, so a hit never refreshes an entry's position; overwriting
/// an existing key keeps its original slot.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            max_entries: cap.get(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let mut entries = self.lock();
        match entries.peek(key.as_str()) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.data.clone())),
            Some(_) => {}
        }
        entries.pop(key.as_str());
        Ok(None)
    }
    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<()> {
        let mut entries = self.lock();
        if let Some(slot) = entries.peek_mut(key.as_str()) {
            *slot = CacheEntry::new(value.to_vec(), ttl);
            return Ok(());
        }
        // `push` drops the least recently inserted entry when full
        entries.push(key.as_str().to_string(), CacheEntry::new(value.to_vec(), ttl));
        Ok(())
    }
    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.lock().pop(key.as_str()).is_some())
    }
    async fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let mut entries = self.lock();
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(k, _)| k.contains(pattern))
            .map(|(k, _)| k.clone())
            .collect();
        for k in &doomed {
            entries.pop(k);
        }
        Ok(doomed.len())
    }
    async fn clear(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(self.lock().iter().filter(|(_, e)| !e.is_expired()).count())
    }
    fn capacity(&self) -> usize {
        self.max_entries
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

pub struct NullCache;
impl NullCache {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
    async fn set(&self, _: &CacheKey, _: &[u8], _: Duration) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }
    async fn delete_matching(&self, _: &str) -> Result<usize> {
        Ok(0)
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
    fn capacity(&self) -> usize {
        0
    }
    fn name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str) -> CacheKey {
        CacheKey::new("GET", path, None)
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_evicts_oldest_inserted_even_after_reads() {
        let cache = MemoryCache::new(2);
        cache.set(&key("/a"), b"1", TTL).await.unwrap();
        cache.set(&key("/b"), b"2", TTL).await.unwrap();
        // a read must not protect /a
        assert!(cache.get(&key("/a")).await.unwrap().is_some());
        cache.set(&key("/c"), b"3", TTL).await.unwrap();

        assert!(cache.get(&key("/a")).await.unwrap().is_none());
        assert_eq!(cache.get(&key("/b")).await.unwrap().as_deref(), Some(&b"2"[..]));
        assert_eq!(cache.get(&key("/c")).await.unwrap().as_deref(), Some(&b"3"[..]));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_slot_and_does_not_evict() {
        let cache = MemoryCache::new(2);
        cache.set(&key("/a"), b"1", TTL).await.unwrap();
        cache.set(&key("/b"), b"2", TTL).await.unwrap();
        cache.set(&key("/a"), b"9", TTL).await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 2);
        cache.set(&key("/c"), b"3", TTL).await.unwrap();
        // /a is still the oldest insertion
        assert!(cache.get(&key("/a")).await.unwrap().is_none());
        assert!(cache.get(&key("/b")).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_absent_and_removed() {
        let cache = MemoryCache::new(4);
        cache.set(&key("/t"), b"x", Duration::from_millis(100)).await.unwrap();
        tokio::time::advance(Duration::from_millis(99)).await;
        assert!(cache.get(&key("/t")).await.unwrap().is_some());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get(&key("/t")).await.unwrap().is_none());
        assert_eq!(cache.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_matching() {
        let cache = MemoryCache::new(8);
        cache.set(&key("/api/traces"), b"1", TTL).await.unwrap();
        cache.set(&key("/api/traces/7"), b"2", TTL).await.unwrap();
        cache.set(&key("/api/evaluations"), b"3", TTL).await.unwrap();
        assert_eq!(cache.delete_matching("/api/traces").await.unwrap(), 2);
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_null_cache_stores_nothing() {
        let cache = NullCache::new();
        cache.set(&key("/a"), b"1", TTL).await.unwrap();
        assert!(cache.get(&key("/a")).await.unwrap().is_none());
        assert_eq!(cache.capacity(), 0);
        assert_eq!(cache.name(), "null");
    }
}
