//! Engine error taxonomy.
//!
//! The contract callers rely on: an ordinary HTTP error status never raises
//! — executors resolve with the response and leave status interpretation to
//! the caller. A rejection means genuine transport failure (with retries
//! exhausted), cancellation, a local setup failure, or a configuration
//! mistake caught synchronously.

use thiserror::Error;

/// Error settled by the Reverb executors.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport failed and no retry is available; no response was
    /// obtained. Carries the total attempt count and the last transport
    /// error message.
    #[error("transport failed after {attempts} attempt(s): {message}")]
    Transport {
        /// Total attempts made, including the initial one.
        attempts: u32,
        /// Message of the final transport error.
        message: String,
    },

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// A local resource needed to run the operation could not be set up.
    #[error("stream setup failed: {0}")]
    StreamSetup(String),

    /// Invalid policy or client configuration. Surfaced synchronously from
    /// builders and `connect`, never through a settled future.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Opening a store is local resource setup; failures there (a cache
/// directory that cannot be created, say) are setup errors, not transport
/// ones. This is the `?` bridge for assembling a client from store parts.
impl From<reverb_backend::StoreError> for Error {
    fn from(error: reverb_backend::StoreError) -> Self {
        Error::StreamSetup(error.to_string())
    }
}

impl Error {
    /// Whether this is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Total attempts recorded on a transport failure, if applicable.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Error::Transport { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_reports_attempt_count() {
        let error = Error::Transport {
            attempts: 4,
            message: "connection timed out".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("4 attempt(s)"), "{text}");
        assert!(text.contains("connection timed out"), "{text}");
        assert_eq!(error.attempts(), Some(4));
    }

    #[test]
    fn cancelled_is_flagged() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Config("x".into()).is_cancelled());
    }

    #[test]
    fn store_setup_failures_map_to_stream_setup() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: Error = reverb_backend::StoreError::Io(io).into();
        assert!(matches!(error, Error::StreamSetup(_)));
        assert!(error.to_string().contains("denied"));
    }
}
