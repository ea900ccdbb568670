//! Per-connection mutable state.

use std::time::Duration;

use http::{HeaderName, HeaderValue};
use reverb_core::{CancelToken, Request, TransportError, backoff};
use tracing::warn;

use super::{SseEvent, SseReconnectPolicy};

const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

/// State of one logical SSE stream across its connection attempts.
///
/// Created per `connect` call, mutated by every attempt, event, and
/// failure, and dropped when the stream settles terminally. Event
/// bookkeeping runs *before* the caller's callback, which is what makes
/// `Last-Event-ID` correct on the next reconnection even if the callback
/// itself fails or the stream drops immediately after.
#[derive(Debug)]
pub struct ConnectionState {
    request: Request,
    policy: SseReconnectPolicy,
    cancel: CancelToken,
    attempt_count: u32,
    last_event_id: Option<String>,
    retry_interval_override: Option<Duration>,
}

impl ConnectionState {
    /// Creates state for a new logical stream.
    pub fn new(request: Request, policy: SseReconnectPolicy, cancel: CancelToken) -> Self {
        ConnectionState {
            request,
            policy,
            cancel,
            attempt_count: 0,
            last_event_id: None,
            retry_interval_override: None,
        }
    }

    /// The reconnection policy for this stream.
    pub fn policy(&self) -> &SseReconnectPolicy {
        &self.policy
    }

    /// The cancellation token for this stream.
    pub fn cancel(&self) -> &CancelToken {
        &self.cancel
    }

    /// Connection attempts made so far, including the initial one.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// The id of the last event delivered, if any.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Increments the attempt counter and builds the request for this
    /// attempt, injecting `Last-Event-ID` (replacing any prior occurrence)
    /// when resuming.
    pub fn begin_attempt(&mut self) -> Request {
        self.attempt_count += 1;
        let mut request = self.request.clone();
        if let Some(id) = &self.last_event_id {
            match HeaderValue::from_str(id) {
                Ok(value) => request.replace_header(LAST_EVENT_ID, value),
                Err(_) => warn!(id, "last event id is not a valid header value, not resuming"),
            }
        }
        request
    }

    /// Records an event's bookkeeping fields. Call before handing the event
    /// to the caller.
    pub fn note_event(&mut self, event: &SseEvent) {
        if let Some(id) = &event.id {
            self.last_event_id = Some(id.clone());
        }
        if let Some(retry) = event.retry {
            self.retry_interval_override = Some(retry);
        }
    }

    /// Whether a failure is eligible for reconnection.
    ///
    /// Eligibility requires: not cancelled, reconnection enabled, attempts
    /// remaining, and the error accepted — by the custom predicate when one
    /// is set, otherwise by case-insensitive substring matching.
    pub fn eligible(&self, error: &TransportError) -> bool {
        !self.cancel.is_cancelled()
            && self.policy.enabled
            && self.attempt_count < self.policy.max_attempts
            && match &self.policy.should_reconnect {
                Some(predicate) => predicate(error),
                None => error.matches_any(&self.policy.retryable_error_substrings),
            }
    }

    /// Computes the delay before the next reconnection attempt.
    ///
    /// A server-supplied `retry:` hint replaces the policy's initial delay
    /// for this and all subsequent computations on this stream; the
    /// exponential multiplier and the cap still apply.
    pub fn reconnect_delay(&self) -> Duration {
        let initial = self.retry_interval_override.unwrap_or(self.policy.initial_delay);
        backoff::delay(
            self.attempt_count,
            initial,
            self.policy.max_delay,
            self.policy.backoff_multiplier,
            self.policy.jitter,
        )
    }
}
