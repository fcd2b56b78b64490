//! The offline cache manager.
//!
//! An [`OfflineWorker`] owns one versioned cache bucket. Its lifecycle is a
//! three-state machine:
//!
//! ```text
//! Uninstalled --install--> Installed --activate--> Active
//! ```
//!
//! `install` opens the bucket and pre-caches the seed URLs, `activate` evicts
//! every other bucket in the storage, and only an `Active` worker
//! intercepts requests. Cacheable GETs are served stale-while-revalidate:
//! a cached entry is returned immediately while a background task refreshes
//! it from the network.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Method, Url};
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinSet};

use crate::error::{FetchError, WorkerError};
use crate::http::{FetchRequest, FetchResponse};
use crate::network::Network;
use crate::policy::CachePolicy;
use crate::storage::CacheStorage;

/// Paths pre-cached on install: the root document and the locations API.
pub const DEFAULT_SEED_PATHS: [&str; 2] = ["/", "/api/locations"];

const BUCKET_PREFIX: &str = "chargemap-cache-";

/// Name of the worker bucket for a deployment version.
#[must_use]
pub fn bucket_name(version: &str) -> String {
    format!("{BUCKET_PREFIX}{version}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninstalled,
    Installed,
    Active,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Uninstalled => write!(f, "uninstalled"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Active => write!(f, "active"),
        }
    }
}

/// Result of pre-caching one seed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Cached { url: String },
    /// The network answered with a non-2xx status; nothing was stored.
    Skipped { url: String, status: u16 },
    Failed { url: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub bucket: String,
    pub seeds: Vec<SeedOutcome>,
}

impl InstallReport {
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.seeds
            .iter()
            .filter(|s| matches!(s, SeedOutcome::Cached { .. }))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct ActivateReport {
    pub bucket: String,
    /// Buckets of other versions that were deleted.
    pub evicted: Vec<String>,
}

pub struct OfflineWorker {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    policy: CachePolicy,
    bucket: String,
    seeds: Vec<Url>,
    state: Mutex<WorkerState>,
    refreshes: Mutex<JoinSet<()>>,
}

impl std::fmt::Debug for OfflineWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineWorker")
            .field("bucket", &self.bucket)
            .field("origin", &self.policy.origin().as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl OfflineWorker {
    /// Creates an uninstalled worker for `version`, seeded with
    /// [`DEFAULT_SEED_PATHS`] on the policy's origin.
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        policy: CachePolicy,
        version: &str,
    ) -> Self {
        let seeds = DEFAULT_SEED_PATHS
            .iter()
            .filter_map(|path| policy.origin().join(path).ok())
            .collect();
        Self {
            storage,
            network,
            policy,
            bucket: bucket_name(version),
            seeds,
            state: Mutex::new(WorkerState::Uninstalled),
            refreshes: Mutex::new(JoinSet::new()),
        }
    }

    /// Replaces the seed list.
    #[must_use]
    pub fn with_seeds(mut self, seeds: Vec<Url>) -> Self {
        self.seeds = seeds;
        self
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_state(&self, expected: WorkerState, to: WorkerState) -> Result<(), WorkerError> {
        let from = self.state();
        if from == expected {
            Ok(())
        } else {
            Err(WorkerError::InvalidTransition { from, to })
        }
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), WorkerError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != from {
            return Err(WorkerError::InvalidTransition { from: *state, to });
        }
        *state = to;
        Ok(())
    }

    /// Opens the bucket and pre-caches every seed URL, then skips waiting.
    ///
    /// Seeds are fetched concurrently; a failing seed is recorded in the
    /// report and never aborts the install.
    ///
    /// # Errors
    ///
    /// - [`WorkerError::InvalidTransition`] if the worker is not `Uninstalled`.
    /// - [`WorkerError::Storage`] if the bucket cannot be opened.
    pub async fn install(&self) -> Result<InstallReport, WorkerError> {
        self.ensure_state(WorkerState::Uninstalled, WorkerState::Installed)?;

        self.storage.open(&self.bucket).await?;
        tracing::info!(bucket = %self.bucket, "opened cache");

        let seeds = join_all(self.seeds.iter().map(|url| self.seed(url))).await;
        for outcome in &seeds {
            match outcome {
                SeedOutcome::Cached { url } => tracing::debug!(%url, "seed cached"),
                SeedOutcome::Skipped { url, status } => {
                    tracing::warn!(%url, status, "seed not cached: non-success status");
                }
                SeedOutcome::Failed { url, reason } => {
                    tracing::warn!(%url, %reason, "seed not cached");
                }
            }
        }

        self.transition(WorkerState::Uninstalled, WorkerState::Installed)?;
        Ok(InstallReport {
            bucket: self.bucket.clone(),
            seeds,
        })
    }

    async fn seed(&self, url: &Url) -> SeedOutcome {
        let request = FetchRequest::get(url.clone());
        let url = url.to_string();
        match self.network.fetch(&request).await {
            Ok(response) if response.is_success() => {
                match self
                    .storage
                    .put(&self.bucket, request.cache_key(), &response)
                    .await
                {
                    Ok(()) => SeedOutcome::Cached { url },
                    Err(e) => SeedOutcome::Failed {
                        url,
                        reason: e.to_string(),
                    },
                }
            }
            Ok(response) => SeedOutcome::Skipped {
                url,
                status: response.status,
            },
            Err(e) => SeedOutcome::Failed {
                url,
                reason: e.to_string(),
            },
        }
    }

    /// Evicts the buckets of other worker versions, then claims clients.
    ///
    /// Deletes every bucket whose name is not this worker's bucket, including
    /// buckets written by the page, and completes only after every eviction
    /// has finished.
    ///
    /// # Errors
    ///
    /// - [`WorkerError::InvalidTransition`] if the worker is not `Installed`.
    /// - [`WorkerError::Storage`] if buckets cannot be listed or deleted; the
    ///   worker then stays `Installed`.
    pub async fn activate(&self) -> Result<ActivateReport, WorkerError> {
        self.ensure_state(WorkerState::Installed, WorkerState::Active)?;

        let stale: Vec<String> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| *name != self.bucket)
            .collect();

        let results = join_all(stale.iter().map(|name| self.storage.delete(name))).await;
        let mut evicted = Vec::with_capacity(stale.len());
        for (name, result) in stale.into_iter().zip(results) {
            if result? {
                tracing::info!(bucket = %name, "evicted stale cache bucket");
                evicted.push(name);
            }
        }

        self.transition(WorkerState::Installed, WorkerState::Active)?;
        tracing::info!(bucket = %self.bucket, "service worker activated");
        Ok(ActivateReport {
            bucket: self.bucket.clone(),
            evicted,
        })
    }

    /// Handles one intercepted request.
    ///
    /// Requests pass straight to the network unless the worker is `Active`,
    /// the method is GET and the URL is cacheable. Cacheable requests are
    /// served stale-while-revalidate; with nothing cached and no network the
    /// response is [`FetchResponse::offline_placeholder`].
    ///
    /// # Errors
    ///
    /// Only pass-through requests can fail, with the network's own error.
    pub async fn handle_fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        if self.state() != WorkerState::Active
            || request.method != Method::GET
            || !self.policy.is_cacheable(&request.url)
        {
            return self.network.fetch(&request).await;
        }
        Ok(self.stale_while_revalidate(request).await)
    }

    async fn stale_while_revalidate(&self, request: FetchRequest) -> FetchResponse {
        let (result_tx, result_rx) = oneshot::channel();
        let (lookup_done_tx, lookup_done_rx) = oneshot::channel::<()>();

        let network = Arc::clone(&self.network);
        let storage = Arc::clone(&self.storage);
        let bucket = self.bucket.clone();
        let refresh_request = request.clone();
        self.spawn_refresh(async move {
            let result = network.fetch(&refresh_request).await;
            let fresh = match &result {
                Ok(response) if response.is_success() => Some(response.clone()),
                _ => None,
            };
            // The caller may already have answered from cache.
            let _ = result_tx.send(result);

            // A refresh must not land before the caller's lookup has read the
            // previous entry.
            let _ = lookup_done_rx.await;

            if let Some(response) = fresh {
                let key = refresh_request.cache_key();
                match storage.put(&bucket, key, &response).await {
                    Ok(()) => tracing::debug!(%bucket, key, "cache refreshed"),
                    Err(e) => tracing::error!(%bucket, key, error = %e, "cache put failed"),
                }
            }
        });

        let cached = match self.storage.get(&self.bucket, request.cache_key()).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        };
        let _ = lookup_done_tx.send(());

        if let Some(cached) = cached {
            tracing::debug!(url = %request.url, "serving cached response");
            return cached;
        }

        match result_rx.await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(url = %request.url, error = %e, "network unavailable and nothing cached");
                FetchResponse::offline_placeholder()
            }
            Err(_) => {
                tracing::error!(url = %request.url, "refresh task ended without a result");
                FetchResponse::offline_placeholder()
            }
        }
    }

    fn spawn_refresh<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.refreshes.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(finished) = tasks.try_join_next() {
            log_refresh_result(finished);
        }
        tasks.spawn(task);
    }

    /// Waits for every in-flight background refresh to finish.
    pub async fn settle(&self) {
        let mut tasks = {
            let mut guard = self.refreshes.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        while let Some(finished) = tasks.join_next().await {
            log_refresh_result(finished);
        }
    }
}

fn log_refresh_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "background cache refresh panicked");
        }
    }
}

#[async_trait]
impl Network for OfflineWorker {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.handle_fetch(request.clone()).await
    }
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;
