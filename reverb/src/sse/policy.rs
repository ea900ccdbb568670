//! Reconnection policy for SSE streams.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reverb_core::TransportError;
use reverb_core::policy::default_retryable_substrings;

/// Observer invoked before each scheduled reconnection with the attempt
/// number so far, the computed delay, and the triggering error.
pub type ReconnectCallback = Arc<dyn Fn(u32, Duration, &TransportError) + Send + Sync>;

/// Custom reconnect-eligibility predicate. When present it fully replaces
/// the substring matching.
pub type ReconnectPredicate = Arc<dyn Fn(&TransportError) -> bool + Send + Sync>;

/// Configuration for SSE reconnection behavior.
#[derive(Clone)]
pub struct SseReconnectPolicy {
    /// Whether reconnection happens at all. Disabled means any connection
    /// failure surfaces immediately.
    pub enabled: bool,
    /// Maximum total connection attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first reconnection.
    pub initial_delay: Duration,
    /// Upper bound on any computed delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay on each successive reconnection.
    pub backoff_multiplier: f64,
    /// Whether to randomize computed delays by ±25%.
    pub jitter: bool,
    /// Error-message fragments that make a failure reconnect-eligible.
    pub retryable_error_substrings: Vec<String>,
    /// Invoked before each scheduled reconnection.
    pub on_reconnect: Option<ReconnectCallback>,
    /// Overrides substring matching when present.
    pub should_reconnect: Option<ReconnectPredicate>,
}

impl Default for SseReconnectPolicy {
    fn default() -> Self {
        // Streams drop with "closed"/"reset" flavored messages that the
        // plain retry defaults don't cover; a dropped stream should
        // reconnect by default while a handshake rejection should not.
        let mut substrings = default_retryable_substrings();
        substrings.push("connection closed".to_string());
        substrings.push("stream reset".to_string());
        SseReconnectPolicy {
            enabled: true,
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
            retryable_error_substrings: substrings,
            on_reconnect: None,
            should_reconnect: None,
        }
    }
}

impl fmt::Debug for SseReconnectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseReconnectPolicy")
            .field("enabled", &self.enabled)
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("retryable_error_substrings", &self.retryable_error_substrings)
            .field("on_reconnect", &self.on_reconnect.as_ref().map(|_| "..."))
            .field("should_reconnect", &self.should_reconnect.as_ref().map(|_| "..."))
            .finish()
    }
}

impl SseReconnectPolicy {
    /// A policy that never reconnects.
    pub fn disabled() -> Self {
        SseReconnectPolicy {
            enabled: false,
            ..SseReconnectPolicy::default()
        }
    }

    /// A default policy with the given attempt ceiling.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        SseReconnectPolicy {
            max_attempts,
            ..SseReconnectPolicy::default()
        }
    }

    /// Validates policy parameters, returning a description of the first
    /// problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(format!(
                "max_delay ({:?}) must not be below initial_delay ({:?})",
                self.max_delay, self.initial_delay
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_stream_drops() {
        let policy = SseReconnectPolicy::default();
        let dropped = TransportError::new("connection closed by server");
        assert!(dropped.matches_any(&policy.retryable_error_substrings));
        let refused = TransportError::new("Connection refused (os error 111)");
        assert!(refused.matches_any(&policy.retryable_error_substrings));
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let policy = SseReconnectPolicy {
            max_attempts: 0,
            ..SseReconnectPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
