use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{validate_bucket_name, CacheStorage};
use crate::error::StorageError;
use crate::http::FetchResponse;

/// Distinguishes temporary files of concurrent writes within one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Durable [`CacheStorage`] rooted at a directory.
///
/// Layout: `<root>/<bucket>/<sha256(key)>.json`. Each file holds the original
/// key, the write time and the response. Each write goes to its own temporary
/// file that is renamed into place, so a reader never sees a partially written
/// entry and concurrent writers of one key never share a temporary path. The
/// last rename wins.
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    stored_at: DateTime<Utc>,
    response: FetchResponse,
}

impl DiskCacheStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        validate_bucket_name(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn entry_path(dir: &Path, key: &str) -> PathBuf {
        dir.join(format!("{}.json", entry_file_stem(key)))
    }
}

/// Hex SHA-256 of the cache key; stable across runs.
pub(crate) fn entry_file_stem(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, bucket: &str) -> Result<(), StorageError> {
        let dir = self.bucket_dir(bucket)?;
        tokio::fs::create_dir_all(&dir).await?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_bucket_name(name).is_ok() {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, bucket: &str) -> Result<bool, StorageError> {
        let dir = self.bucket_dir(bucket)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<FetchResponse>, StorageError> {
        let path = Self::entry_path(&self.bucket_dir(bucket)?, key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: StoredEntry =
            serde_json::from_slice(&raw).map_err(|source| StorageError::Serialize {
                context: format!("{bucket}/{key}"),
                source,
            })?;

        // Two keys hashing to the same file would be a collision; treat as a miss.
        if entry.key != key {
            tracing::warn!(bucket, key, stored_key = %entry.key, "cache entry key mismatch");
            return Ok(None);
        }
        Ok(Some(entry.response))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        response: &FetchResponse,
    ) -> Result<(), StorageError> {
        let dir = self.bucket_dir(bucket)?;
        tokio::fs::create_dir_all(&dir).await?;

        let entry = StoredEntry {
            key: key.to_owned(),
            stored_at: Utc::now(),
            response: response.clone(),
        };
        let raw = serde_json::to_vec(&entry).map_err(|source| StorageError::Serialize {
            context: format!("{bucket}/{key}"),
            source,
        })?;

        let path = Self::entry_path(&dir, key);
        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("json.{}.{seq}.tmp", std::process::id()));
        tokio::fs::write(&tmp, &raw).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}
