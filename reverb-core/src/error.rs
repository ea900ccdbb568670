//! Transport-level error type.

use thiserror::Error;

/// An error raised by the transport collaborator: DNS failure, connect
/// refusal, TLS handshake failure, timeout. No response was obtained.
///
/// Retryability decisions are made by case-insensitive substring matching
/// against the error message, so adapters should preserve the underlying
/// library's message text rather than rewording it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Creates a transport error carrying the given message.
    pub fn new(message: impl Into<String>) -> Self {
        TransportError {
            message: message.into(),
        }
    }

    /// The error message as produced by the transport.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the message contains any of the given needles,
    /// case-insensitively.
    pub fn matches_any(&self, needles: &[String]) -> bool {
        let haystack = self.message.to_lowercase();
        needles
            .iter()
            .any(|needle| haystack.contains(&needle.to_lowercase()))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::new(err.to_string())
    }
}
