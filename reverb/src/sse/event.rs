//! A single Server-Sent Event.

use std::time::Duration;

/// One event parsed off an SSE stream.
///
/// Typed accessors cover the standard fields; `fields` retains every
/// non-comment field line in arrival order (including the standard ones)
/// so callers can reach forward-compatible extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event id (`id:`), used for `Last-Event-ID` resumption.
    pub id: Option<String>,
    /// Event type (`event:`). Absent means "message".
    pub event: Option<String>,
    /// Payload (`data:`); multiple data lines are joined with `\n`.
    pub data: Option<String>,
    /// Server-requested reconnection interval (`retry:`, milliseconds).
    pub retry: Option<Duration>,
    /// Every field of the record, raw, in arrival order.
    pub fields: Vec<(String, String)>,
}

impl SseEvent {
    /// The event type, defaulting to `"message"` per the SSE contract.
    pub fn event_type(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    /// The payload, defaulting to the empty string.
    pub fn data_str(&self) -> &str {
        self.data.as_deref().unwrap_or("")
    }

    /// Whether no field of this record was ever set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
