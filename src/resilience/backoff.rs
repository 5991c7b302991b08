//! Backoff delays between retry attempts.
//!
//! The delay is a pure function of the attempt number, the strategy and the
//! base delay. No jitter is applied, so a given configuration always produces
//! the same schedule.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// `base * 2^(attempt - 1)`
    #[default]
    Exponential,
    /// `base * attempt`
    Linear,
    /// `base`
    Fixed,
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exponential => "exponential",
            Self::Linear => "linear",
            Self::Fixed => "fixed",
        };
        f.write_str(s)
    }
}

/// Delay to wait after the failed `attempt` (1-based) before the next one.
///
/// Attempt 0 is treated as attempt 1. Arithmetic saturates instead of
/// overflowing.
pub fn delay(attempt: u32, strategy: BackoffStrategy, base: Duration) -> Duration {
    let attempt = attempt.max(1);
    let factor = match strategy {
        BackoffStrategy::Exponential => match 1u32.checked_shl(attempt - 1) {
            Some(factor) => factor,
            None => return Duration::MAX,
        },
        BackoffStrategy::Linear => attempt,
        BackoffStrategy::Fixed => 1,
    };
    base.checked_mul(factor).unwrap_or(Duration::MAX)
}
