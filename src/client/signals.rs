use crate::batch::BatchStats;
use crate::cache::CacheStats;
use crate::resilience::rate_limiter::RateLimiterSnapshot;

/// A lightweight snapshot of the client's runtime state.
///
/// Facts only: cache counters, limiter backlog and batch queue. Callers can
/// build their own admission or scheduling decisions on top.
#[derive(Debug, Clone, Default)]
pub struct SignalsSnapshot {
    pub cache: CacheStats,
    pub rate_limiter: Option<RateLimiterSnapshot>,
    pub batch: Option<BatchStats>,
}
