//! Exponential backoff math shared by retry and SSE reconnection.
//!
//! Pure functions: attempt number and policy parameters in, delay out.
//! No state lives here.

use std::time::Duration;

/// Computes the delay before the given attempt.
///
/// `attempt` is 1-based: the first retry (or reconnect) uses `attempt = 1`
/// and waits `initial`. The raw delay grows as
/// `initial * multiplier^(attempt - 1)` and is capped at `max`.
///
/// With `jitter` enabled the raw delay is scaled by a uniform random factor
/// in `[0.75, 1.25)` — symmetric, bounded, and never negative — so that a
/// fleet of clients recovering from the same outage does not retry in
/// lockstep.
pub fn delay(attempt: u32, initial: Duration, max: Duration, multiplier: f64, jitter: bool) -> Duration {
    // Exponents past ~1000 are saturated by the cap anyway; clamping keeps
    // the i32 conversion safe for absurd attempt counts.
    let exponent = (attempt.max(1) - 1).min(1_000) as i32;
    let raw = initial.as_secs_f64() * multiplier.powi(exponent);
    let capped = raw.min(max.as_secs_f64());
    let scaled = if jitter {
        capped * jitter_factor()
    } else {
        capped
    };
    Duration::from_secs_f64(scaled.max(0.0))
}

fn jitter_factor() -> f64 {
    0.75 + rand::random::<f64>() * 0.5
}
