//! Typed policy configuration for retry and caching.
//!
//! Policies are plain data: constructed once, cloned freely, and passed by
//! value into the executors. Durations serialize in human-friendly form
//! ("500ms", "1m") via `humantime-serde`.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TransportError;
use crate::backoff;

/// Default retryable error-message fragments, matched case-insensitively.
///
/// These cover the transient failure vocabulary of the common HTTP stacks:
/// timeouts, refused/reset/failed connections, and DNS resolution failures.
pub fn default_retryable_substrings() -> Vec<String> {
    [
        "timeout",
        "timed out",
        "curl error",
        "connection failed",
        "connection refused",
        "connection reset",
        "could not resolve host",
        "dns error",
        "broken pipe",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

fn default_retryable_status_codes() -> HashSet<u16> {
    [408, 429, 500, 502, 503, 504].into_iter().collect()
}

/// Configuration for the retry executor.
///
/// Immutable once constructed. A policy with `max_retries = 0` issues the
/// request exactly once and never backs off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry (e.g. "500ms").
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Upper bound on any computed delay (e.g. "30s").
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Multiplier applied to the delay on each successive retry.
    pub backoff_multiplier: f64,
    /// Whether to randomize computed delays by ±25%.
    pub jitter: bool,
    /// Response status codes that trigger a retry.
    pub retryable_status_codes: HashSet<u16>,
    /// Transport-error message fragments that trigger a retry.
    pub retryable_error_substrings: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
            retryable_status_codes: default_retryable_status_codes(),
            retryable_error_substrings: default_retryable_substrings(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries: one attempt, transport errors reject
    /// immediately, every obtained response resolves.
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        }
    }

    /// A default policy with the given retry count.
    pub fn with_retries(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            ..RetryPolicy::default()
        }
    }

    /// Computes the backoff delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        backoff::delay(
            attempt,
            self.base_delay,
            self.max_delay,
            self.backoff_multiplier,
            self.jitter,
        )
    }

    /// Whether a response with this status should be retried.
    pub fn retryable_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// Whether a transport error should be retried.
    pub fn retryable_error(&self, error: &TransportError) -> bool {
        error.matches_any(&self.retryable_error_substrings)
    }

    /// Validates policy parameters, returning a description of the first
    /// problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        if self.max_delay < self.base_delay {
            return Err(format!(
                "max_delay ({:?}) must not be below base_delay ({:?})",
                self.max_delay, self.base_delay
            ));
        }
        Ok(())
    }
}

/// Configuration for the cache layer.
///
/// The backing store is not part of the policy: it is constructed by the
/// caller and injected into the engine explicitly, so per-call policies stay
/// plain data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachePolicy {
    /// Freshness lifetime used when the server supplies no `max-age`.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Whether to honor `Cache-Control: max-age` for freshness and to send
    /// conditional revalidation headers for stale entries.
    pub respect_server_headers: bool,
    /// Explicit cache key. When absent the key is derived from the URL.
    pub key: Option<String>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            ttl: Duration::from_secs(300),
            respect_server_headers: true,
            key: None,
        }
    }
}

impl CachePolicy {
    /// A policy with the given freshness lifetime and defaults otherwise.
    pub fn with_ttl(ttl: Duration) -> Self {
        CachePolicy {
            ttl,
            ..CachePolicy::default()
        }
    }

    /// Validates policy parameters.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(key) = &self.key
            && key.is_empty()
        {
            return Err("explicit cache key must not be empty".to_string());
        }
        Ok(())
    }
}
