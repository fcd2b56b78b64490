//! Named cache buckets mapping request keys to stored responses.
//!
//! Every operation acquires the bucket it touches for the duration of that
//! operation only; there is no long-lived handle and no cross-call locking.

mod disk;
mod memory;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::http::FetchResponse;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Opens `bucket`, creating it if it does not exist.
    async fn open(&self, bucket: &str) -> Result<(), StorageError>;

    /// Names of all existing buckets.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Deletes `bucket` and all of its entries. Returns `false` if it did not
    /// exist.
    async fn delete(&self, bucket: &str) -> Result<bool, StorageError>;

    /// Looks up `key` in `bucket`. A missing bucket is a miss, not an error.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<FetchResponse>, StorageError>;

    /// Stores `response` under `key`, creating the bucket if needed and
    /// overwriting any previous entry.
    async fn put(&self, bucket: &str, key: &str, response: &FetchResponse)
        -> Result<(), StorageError>;
}

/// Bucket names become directory names on disk, so they are restricted to a
/// conservative character set.
pub(crate) fn validate_bucket_name(bucket: &str) -> Result<(), StorageError> {
    let valid = !bucket.is_empty()
        && !bucket.starts_with('.')
        && bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidBucket(bucket.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_names_are_restricted() {
        assert!(validate_bucket_name("chargemap-cache-v1").is_ok());
        assert!(validate_bucket_name("chargemap_locations.2").is_ok());
        assert!(validate_bucket_name("").is_err());
        assert!(validate_bucket_name("..").is_err());
        assert!(validate_bucket_name("a/b").is_err());
    }
}
