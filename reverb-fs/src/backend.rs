//! Filesystem store implementation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reverb_backend::{DeleteStatus, Store, StoreError, StoreResult, StoreValue};
use tracing::{debug, warn};

/// Cache store keyed by a directory on the local filesystem.
///
/// Each key maps to one JSON envelope file holding the payload and its
/// expiry. Reads of expired or undecodable files delete the file and report
/// a miss, so a directory never needs offline garbage collection to stay
/// correct (it may still grow with never-reread keys).
///
/// Writes go through a temp file plus rename, so readers never observe a
/// partially-written envelope.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(FsStore { dir })
    }

    /// The directory this store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are normally "http_<sha1-hex>"; anything else is sanitized so
        // a hostile key cannot escape the store directory.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    async fn discard(&self, path: &Path, reason: &str) {
        warn!(path = %path.display(), reason, "discarding unusable cache file");
        if let Err(error) = tokio::fs::remove_file(path).await
            && error.kind() != ErrorKind::NotFound
        {
            warn!(path = %path.display(), %error, "failed to remove cache file");
        }
    }
}

#[async_trait]
impl Store for FsStore {
    async fn read(&self, key: &str) -> StoreResult<Option<StoreValue>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let value: StoreValue = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(_) => {
                self.discard(&path, "corrupt envelope").await;
                return Ok(None);
            }
        };

        if value.is_expired(Utc::now()) {
            self.discard(&path, "expired").await;
            return Ok(None);
        }

        debug!(key, bytes = bytes.len(), "cache file read");
        Ok(Some(value))
    }

    async fn write(&self, key: &str, value: StoreValue, _ttl: Option<Duration>) -> StoreResult<()> {
        let path = self.path_for(key);
        let encoded = serde_json::to_vec(&value)
            .map_err(|error| StoreError::Serialization(error.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &encoded).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(key, bytes = encoded.len(), "cache file written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<DeleteStatus> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(DeleteStatus::Deleted(1)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(DeleteStatus::Missing),
            Err(error) => Err(error.into()),
        }
    }

    fn name(&self) -> &str {
        "fs"
    }
}
