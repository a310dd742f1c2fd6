//! Exponential backoff with optional full jitter
//!
//! `raw = min(cap, base * 2^(attempt - 1))`. With jitter the delay is drawn
//! uniformly from `[0, raw]`, which spreads out clients that failed together.

use std::time::Duration;

/// Largest shift applied to `base`; beyond this the cap always wins anyway.
const MAX_EXPONENT: u32 = 31;

/// Un-jittered delay for `attempt` (1-based). Never exceeds `cap`.
pub fn raw_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
    base.checked_mul(1u32 << exponent).unwrap_or(cap).min(cap)
}

/// Delay to sleep before the attempt after `attempt`.
pub fn delay(attempt: u32, base: Duration, cap: Duration, jitter: bool) -> Duration {
    let raw = raw_delay(attempt, base, cap);
    if !jitter {
        return raw;
    }
    let max_ms = u64::try_from(raw.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::random_range(0..=max_ms))
}
