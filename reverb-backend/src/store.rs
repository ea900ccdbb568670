//! The store trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{DeleteStatus, StoreError, StoreValue};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A pluggable key-value store used by the cache layer.
///
/// Concurrent operations on the same key are intentionally uncoordinated:
/// two simultaneous writers race and the last one wins. The engine accepts
/// this (misses may duplicate upstream work but never corrupt state), so
/// implementations need no locking beyond their own internal consistency.
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads the value stored under `key`, `None` if absent or expired.
    async fn read(&self, key: &str) -> StoreResult<Option<StoreValue>>;

    /// Stores `value` under `key`.
    ///
    /// `ttl` is a hint for stores with native expiration; stores without it
    /// may rely on the expiry embedded in the value instead.
    async fn write(&self, key: &str, value: StoreValue, ttl: Option<Duration>) -> StoreResult<()>;

    /// Removes the value stored under `key`.
    async fn remove(&self, key: &str) -> StoreResult<DeleteStatus>;

    /// The name of this store, used in log output.
    fn name(&self) -> &str {
        "store"
    }
}

#[async_trait]
impl<T: Store + ?Sized> Store for Arc<T> {
    async fn read(&self, key: &str) -> StoreResult<Option<StoreValue>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: StoreValue, ttl: Option<Duration>) -> StoreResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> StoreResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: Store + ?Sized> Store for Box<T> {
    async fn read(&self, key: &str) -> StoreResult<Option<StoreValue>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: StoreValue, ttl: Option<Duration>) -> StoreResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> StoreResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
