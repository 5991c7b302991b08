use crate::{Error, ErrorContext, Result};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub rps: f64,
    /// Callers currently waiting for their slot.
    pub pending: usize,
    /// Wait until the next free slot (ms), if the limiter is currently busy.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterConfig {
    /// Operations released per second.
    pub rps: f64,
}

impl RateLimiterConfig {
    /// Returns `None` for rates that cannot drive a schedule (≤0, NaN, ∞).
    pub fn from_rps(rps: f64) -> Option<Self> {
        if !rps.is_finite() || rps <= 0.0 {
            return None;
        }
        Some(Self { rps })
    }

    /// Like [`from_rps`](Self::from_rps) but reports the bad value as a
    /// `validation_error`.
    pub fn try_from_rps(rps: f64) -> Result<Self> {
        Self::from_rps(rps).ok_or_else(|| {
            Error::validation(
                format!("requests_per_second must be a positive finite number, got {}", rps),
                ErrorContext::new().with_source("rate_limiter"),
            )
        })
    }

    /// Spacing between two consecutive slots.
    pub fn interval(&self) -> Duration {
        Duration::from_nanos((1e9 / self.rps).round() as u64)
    }
}

#[derive(Debug)]
struct State {
    /// Earliest instant the next caller may be released.
    next_slot: Option<Instant>,
}

struct PendingGuard<'a>(&'a AtomicUsize);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed-rate admission queue.
///
/// - Callers are released in arrival order, one every `1 / rps` seconds
/// - Slots are reserved at arrival, so a slow operation never delays later ones
/// - The first caller after an idle period is released immediately
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    interval: Duration,
    state: Mutex<State>,
    pending: AtomicUsize,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        Self {
            interval: cfg.interval(),
            cfg,
            state: Mutex::new(State { next_slot: None }),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.cfg
    }

    /// Wait for this caller's slot (may sleep).
    pub async fn acquire(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let _guard = PendingGuard(&self.pending);

        let slot = {
            let mut st = self.state.lock().await;
            let now = Instant::now();
            let slot = match st.next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            st.next_slot = Some(slot + self.interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }

    /// Run `op` once its slot comes up and return its result unchanged.
    pub async fn throttle<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        op().await
    }

    pub async fn snapshot(&self) -> RateLimiterSnapshot {
        let st = self.state.lock().await;
        let now = Instant::now();
        let estimated_wait_ms = st
            .next_slot
            .filter(|next| *next > now)
            .map(|next| next.duration_since(now).as_millis() as u64);

        RateLimiterSnapshot {
            rps: self.cfg.rps,
            pending: self.pending.load(Ordering::SeqCst),
            estimated_wait_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_rate_limiter_config_from_rps() {
        let config = RateLimiterConfig::from_rps(4.0).unwrap();
        assert_eq!(config.rps, 4.0);
        assert_eq!(config.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_rate_limiter_config_from_rps_invalid() {
        assert!(RateLimiterConfig::from_rps(0.0).is_none());
        assert!(RateLimiterConfig::from_rps(-1.0).is_none());
        assert!(RateLimiterConfig::from_rps(f64::NAN).is_none());
        assert!(RateLimiterConfig::from_rps(f64::INFINITY).is_none());
        let err = RateLimiterConfig::try_from_rps(0.0).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::ValidationError);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(RateLimiterConfig::from_rps(2.0).unwrap());
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_releases_at_fixed_rate_in_order() {
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::from_rps(2.0).unwrap()));
        let start = Instant::now();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..3u32 {
            let limiter = limiter.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .throttle(|| async {
                        order.lock().unwrap().push((i, start.elapsed().as_millis()));
                    })
                    .await
            }));
            // make arrival order deterministic
            tokio::task::yield_now().await;
        }
        for h in handles {
            h.await.unwrap();
        }

        let got = order.lock().unwrap().clone();
        assert_eq!(got, vec![(0, 0), (1, 500), (2, 1000)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_duration_does_not_shift_schedule() {
        let limiter = RateLimiter::new(RateLimiterConfig::from_rps(10.0).unwrap());
        let start = Instant::now();
        limiter
            .throttle(|| tokio::time::sleep(Duration::from_millis(250)))
            .await;
        // slot for the second caller was 100ms, already in the past
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_passes_errors_through() {
        let limiter = RateLimiter::new(RateLimiterConfig::from_rps(5.0).unwrap());
        let res: std::result::Result<(), &str> = limiter.throttle(|| async { Err("boom") }).await;
        assert_eq!(res, Err("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_snapshot() {
        let limiter = RateLimiter::new(RateLimiterConfig::from_rps(5.0).unwrap());
        let snap = limiter.snapshot().await;
        assert_eq!(snap.rps, 5.0);
        assert_eq!(snap.pending, 0);
        assert!(snap.estimated_wait_ms.is_none());

        limiter.acquire().await;
        let snap = limiter.snapshot().await;
        assert_eq!(snap.estimated_wait_ms, Some(200));
    }
}
