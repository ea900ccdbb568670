//! Moka store implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use reverb_backend::{DeleteStatus, Store, StoreResult, StoreValue};
use tracing::debug;

/// In-memory cache store powered by Moka.
///
/// Entries are bounded by `max_capacity`; least-recently-used entries are
/// evicted when the cache fills. Expiry is enforced on the read path from
/// the value's own metadata, so Moka's background eviction being best-effort
/// never serves a dead entry.
#[derive(Debug, Clone)]
pub struct MokaStore {
    cache: Cache<String, StoreValue>,
}

impl MokaStore {
    /// Creates a store holding at most `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        MokaStore {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Number of entries currently resident (approximate, per Moka).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl Store for MokaStore {
    async fn read(&self, key: &str) -> StoreResult<Option<StoreValue>> {
        match self.cache.get(key).await {
            Some(value) if value.is_expired(Utc::now()) => {
                debug!(key, "evicting expired entry");
                self.cache.invalidate(key).await;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn write(&self, key: &str, value: StoreValue, _ttl: Option<Duration>) -> StoreResult<()> {
        self.cache.insert(key.to_owned(), value).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<DeleteStatus> {
        match self.cache.remove(key).await {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    fn name(&self) -> &str {
        "moka"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = MokaStore::new(16);
        let value = StoreValue::new("v".into(), Some(Utc::now() + TimeDelta::minutes(1)));
        store.write("k", value.clone(), None).await.unwrap();
        assert_eq!(store.read("k").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_miss() {
        let store = MokaStore::new(16);
        let value = StoreValue::new("v".into(), Some(Utc::now() - TimeDelta::seconds(1)));
        store.write("k", value, None).await.unwrap();
        assert_eq!(store.read("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_reports_status() {
        let store = MokaStore::new(16);
        store
            .write("k", StoreValue::new("v".into(), None), None)
            .await
            .unwrap();
        assert_eq!(store.remove("k").await.unwrap(), DeleteStatus::Deleted(1));
        assert_eq!(store.remove("k").await.unwrap(), DeleteStatus::Missing);
    }
}
