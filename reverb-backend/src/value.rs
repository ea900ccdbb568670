//! Stored value wrapper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw byte data type used for serialized store values.
pub type Raw = bytes::Bytes;

/// An opaque value with optional expiry metadata, as persisted by a store.
///
/// The expiry duplicates what the engine keeps inside its serialized
/// payload so that stores can drop dead entries without decoding them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreValue {
    data: Raw,
    expires_at: Option<DateTime<Utc>>,
}

impl StoreValue {
    /// Wraps serialized data with an optional expiry instant.
    pub fn new(data: Raw, expires_at: Option<DateTime<Utc>>) -> Self {
        StoreValue { data, expires_at }
    }

    /// The serialized payload.
    pub fn data(&self) -> &Raw {
        &self.data
    }

    /// When the value expires, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the value is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Remaining lifetime at `now`, or `None` if unknown or non-positive.
    pub fn ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at
            .and_then(|expires_at| (expires_at - now).to_std().ok())
            .filter(|ttl| !ttl.is_zero())
    }

    /// Consumes the wrapper, returning the payload.
    pub fn into_inner(self) -> Raw {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn expiry_checks() {
        let now = Utc::now();
        let live = StoreValue::new("x".into(), Some(now + TimeDelta::seconds(10)));
        let dead = StoreValue::new("x".into(), Some(now - TimeDelta::seconds(10)));
        let eternal = StoreValue::new("x".into(), None);

        assert!(!live.is_expired(now));
        assert!(dead.is_expired(now));
        assert!(!eternal.is_expired(now));
        assert!(live.ttl(now).is_some());
        assert!(dead.ttl(now).is_none());
        assert!(eternal.ttl(now).is_none());
    }
}
