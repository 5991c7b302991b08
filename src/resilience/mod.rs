//! 弹性模块：提供重试退避与限流等可靠性机制。
//!
//! # Resilience Primitives Module
//!
//! Building blocks the request executor composes around every network call.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`backoff`] | Deterministic delay schedule between retry attempts |
//! | [`rate_limiter`] | Fixed-rate FIFO admission queue |
//!
//! ## Backoff
//!
//! ```rust
//! use evalai_sdk::resilience::backoff::{delay, BackoffStrategy};
//! use std::time::Duration;
//!
//! let d = delay(3, BackoffStrategy::Exponential, Duration::from_millis(100));
//! assert_eq!(d, Duration::from_millis(400));
//! ```
//!
//! ## Rate Limiter
//!
//! ```rust
//! use evalai_sdk::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
//!
//! # async fn demo() {
//! let limiter = RateLimiter::new(RateLimiterConfig::from_rps(5.0).unwrap());
//! let value = limiter.throttle(|| async { 42 }).await;
//! assert_eq!(value, 42);
//! # }
//! ```

pub mod backoff;
pub mod rate_limiter;
