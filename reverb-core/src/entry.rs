//! Cached response entries with expiry metadata.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{ETAG, LAST_MODIFIED};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Response;

/// A cached HTTP response.
///
/// An entry is only ever written to a store while `expires_at` lies in the
/// future; readers must still check [`CacheEntry::is_fresh`] because clocks
/// move and stores outlive policies. Any value that fails to decode into
/// this shape is treated as a cache miss by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// Status code of the cached response.
    #[serde(with = "http_serde::status_code")]
    pub status: StatusCode,
    /// Headers of the cached response, including any validators
    /// (`ETag`, `Last-Modified`) used for conditional revalidation.
    #[serde(with = "http_serde::header_map")]
    pub headers: HeaderMap,
    /// Cached response body.
    pub body: Bytes,
    /// Instant at which the entry stops being fresh.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry from response parts and an expiry instant.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        expires_at: DateTime<Utc>,
    ) -> Self {
        CacheEntry {
            status,
            headers,
            body,
            expires_at,
        }
    }

    /// Whether the entry is still fresh at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Remaining freshness lifetime at `now`, or `None` once non-positive.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at - now).to_std().ok().filter(|ttl| !ttl.is_zero())
    }

    /// The cached `ETag` validator, if any.
    pub fn etag(&self) -> Option<&HeaderValue> {
        self.headers.get(ETAG)
    }

    /// The cached `Last-Modified` validator, if any.
    pub fn last_modified(&self) -> Option<&HeaderValue> {
        self.headers.get(LAST_MODIFIED)
    }

    /// Reconstructs a response from the cached parts.
    pub fn to_response(&self) -> Response {
        Response::new(self.status, self.headers.clone(), self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn entry(expires_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry::new(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(b"body"),
            expires_at,
        )
    }

    #[test]
    fn freshness_is_strict() {
        let now = Utc::now();
        assert!(entry(now + TimeDelta::seconds(1)).is_fresh(now));
        assert!(!entry(now).is_fresh(now));
        assert!(!entry(now - TimeDelta::seconds(1)).is_fresh(now));
    }

    #[test]
    fn remaining_ttl_is_none_once_expired() {
        let now = Utc::now();
        assert!(entry(now - TimeDelta::seconds(5)).remaining_ttl(now).is_none());
        let ttl = entry(now + TimeDelta::seconds(30))
            .remaining_ttl(now)
            .unwrap();
        assert!(ttl > Duration::from_secs(29) && ttl <= Duration::from_secs(30));
    }

    #[test]
    fn serde_round_trip_preserves_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("\"abc\""));
        let entry = CacheEntry::new(
            StatusCode::OK,
            headers,
            Bytes::from_static(b"payload"),
            Utc::now() + TimeDelta::minutes(5),
        );

        let json = serde_json::to_vec(&entry).unwrap();
        let back: CacheEntry = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.etag().unwrap(), "\"abc\"");
    }

    #[test]
    fn malformed_json_fails_to_decode() {
        let malformed = br#"{"status": "not-a-number"}"#;
        assert!(serde_json::from_slice::<CacheEntry>(malformed).is_err());
    }
}
