use super::config::RetryPolicy;
use crate::Error;
use std::time::Duration;

/// Internal decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Internal policy engine for the retry loop.
///
/// Keep this deterministic: the delay depends only on the attempt number and
/// the configured backoff, never on server hints.
pub(crate) struct PolicyEngine {
    retry: RetryPolicy,
}

impl PolicyEngine {
    pub fn new(retry: &RetryPolicy) -> Self {
        Self {
            retry: retry.clone(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry.max_attempts
    }

    /// Decide what to do after `attempt` (1-based) failed with `err`.
    pub fn decide(&self, err: &Error, attempt: u32) -> Decision {
        let allowed = err.retryable() && self.retry.retryable.contains(&err.kind);
        if allowed && attempt < self.retry.max_attempts {
            Decision::Retry {
                delay: self.retry.delay_for(attempt),
            }
        } else {
            Decision::Fail
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorKind;
    use crate::resilience::backoff::BackoffStrategy;

    fn engine(max: u32, strategy: BackoffStrategy) -> PolicyEngine {
        PolicyEngine::new(
            &RetryPolicy::new()
                .with_max_attempts(max)
                .with_backoff(strategy)
                .with_base_delay(Duration::from_millis(100)),
        )
    }

    #[test]
    fn test_retries_until_max_attempts() {
        let p = engine(3, BackoffStrategy::Exponential);
        let err = Error::from_kind(ErrorKind::InternalError);
        assert_eq!(p.decide(&err, 1), Decision::Retry { delay: Duration::from_millis(100) });
        assert_eq!(p.decide(&err, 2), Decision::Retry { delay: Duration::from_millis(200) });
        assert_eq!(p.decide(&err, 3), Decision::Fail);
    }

    #[test]
    fn test_non_retryable_kind_fails_immediately() {
        let p = engine(5, BackoffStrategy::Fixed);
        for kind in [ErrorKind::Unauthorized, ErrorKind::ValidationError, ErrorKind::NotFound] {
            assert_eq!(p.decide(&Error::from_kind(kind), 1), Decision::Fail);
        }
    }

    #[test]
    fn test_configured_set_narrows_retries() {
        let p = PolicyEngine::new(&RetryPolicy::new().with_retryable(vec![ErrorKind::Timeout]));
        assert_eq!(p.decide(&Error::from_kind(ErrorKind::RateLimited), 1), Decision::Fail);
        assert!(matches!(p.decide(&Error::from_kind(ErrorKind::Timeout), 1), Decision::Retry { .. }));
    }

    #[test]
    fn test_configured_set_cannot_widen_retries() {
        let p = PolicyEngine::new(&RetryPolicy::new().with_retryable(vec![ErrorKind::Forbidden]));
        assert_eq!(p.decide(&Error::from_kind(ErrorKind::Forbidden), 1), Decision::Fail);
    }

    #[test]
    fn test_retry_after_does_not_change_delay() {
        let p = engine(3, BackoffStrategy::Fixed);
        let err = Error::from_kind(ErrorKind::RateLimited).with_retry_after(2);
        assert_eq!(p.decide(&err, 1), Decision::Retry { delay: Duration::from_millis(100) });
    }
}
