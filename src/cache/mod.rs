//! 响应缓存模块：缓存只读请求的响应并在写操作后失效。
//!
//! # Response Caching Module
//!
//! Bounded key→value store for read responses with per-entry expiry and
//! substring-based invalidation.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | Typed get/set/invalidate over a backend, with statistics |
//! | [`CacheConfig`] | Capacity, default TTL and on/off switch |
//! | [`CacheBackend`] | Trait for implementing custom cache backends |
//! | [`MemoryCache`] | In-memory bounded FIFO |
//! | [`NullCache`] | No-op cache for disabling caching |
//! | [`CacheKey`] | `METHOD:url:params` key |
//!
//! ## Example
//!
//! ```rust
//! use evalai_sdk::cache::{CacheConfig, CacheManager};
//!
//! # async fn demo() -> evalai_sdk::Result<()> {
//! let cache = CacheManager::in_memory(CacheConfig::new().with_capacity(100));
//! cache.set("GET", "/api/traces", &vec![1, 2, 3], None, None).await?;
//! let hit: Option<Vec<i32>> = cache.get("GET", "/api/traces", None).await?;
//! assert_eq!(hit, Some(vec![1, 2, 3]));
//! cache.invalidate_pattern("/api/traces").await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod key;
mod manager;
pub mod policy;

pub use backend::{CacheBackend, MemoryCache, NullCache};
pub use key::CacheKey;
pub use manager::{CacheConfig, CacheManager, CacheStats};
pub use policy::{resource_prefix, should_cache, ttl_for, CacheTtl};
