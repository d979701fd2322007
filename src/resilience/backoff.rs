//! Exponential backoff with optional jitter.

use std::time::Duration;

use rand::Rng;

// == Exponential Delay ==
/// `min(base * 2^attempt, cap)`.
pub fn exponential_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor).min(cap)
}

// == Jittered Delay ==
/// `min(base * 2^attempt + jitter, cap)` with jitter drawn from `[0, base)`.
pub fn jittered_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let jitter = base.mul_f64(rand::thread_rng().gen_range(0.0..1.0));
    exponential_delay(attempt, base, cap)
        .saturating_add(jitter)
        .min(cap)
}
