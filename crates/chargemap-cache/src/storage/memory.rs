use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{validate_bucket_name, CacheStorage};
use crate::error::StorageError;
use crate::http::FetchResponse;

type Buckets = BTreeMap<String, HashMap<String, FetchResponse>>;

/// In-process [`CacheStorage`]. Contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    buckets: RwLock<Buckets>,
}

impl MemoryCacheStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Buckets) -> T) -> Result<T, StorageError> {
        let guard = self
            .buckets
            .read()
            .map_err(|_| StorageError::Unavailable("memory cache lock poisoned".to_owned()))?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Buckets) -> T) -> Result<T, StorageError> {
        let mut guard = self
            .buckets
            .write()
            .map_err(|_| StorageError::Unavailable("memory cache lock poisoned".to_owned()))?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, bucket: &str) -> Result<(), StorageError> {
        validate_bucket_name(bucket)?;
        self.write(|buckets| {
            buckets.entry(bucket.to_owned()).or_default();
        })
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.read(|buckets| buckets.keys().cloned().collect())
    }

    async fn delete(&self, bucket: &str) -> Result<bool, StorageError> {
        self.write(|buckets| buckets.remove(bucket).is_some())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<FetchResponse>, StorageError> {
        self.read(|buckets| buckets.get(bucket).and_then(|b| b.get(key)).cloned())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        response: &FetchResponse,
    ) -> Result<(), StorageError> {
        validate_bucket_name(bucket)?;
        self.write(|buckets| {
            buckets
                .entry(bucket.to_owned())
                .or_default()
                .insert(key.to_owned(), response.clone());
        })
    }
}
