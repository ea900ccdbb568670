//! Buffered HTTP response.

use bytes::Bytes;
use http::header::AsHeaderName;
use http::{HeaderMap, StatusCode};

/// A complete, buffered HTTP response.
///
/// Status interpretation is left to the caller: a 4xx/5xx response resolves
/// executors normally and is only ever consulted to decide whether to
/// retry.
#[derive(Debug, Clone)]
pub struct Response {
    /// Response status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Fully-buffered response body.
    pub body: Bytes,
}

impl Response {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Response {
            status,
            headers,
            body,
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the named header as a string, if present and valid UTF-8.
    pub fn header_str(&self, name: impl AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}
