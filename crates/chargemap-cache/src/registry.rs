//! Page-side registration of the offline worker.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{FetchError, WorkerError};
use crate::http::{FetchRequest, FetchResponse};
use crate::network::Network;
use crate::worker::{ActivateReport, InstallReport, OfflineWorker};

/// The registry controls the whole origin.
pub const SCOPE: &str = "/";

/// What the page can tell the user once a worker has installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// First worker for this page: content now works offline.
    OfflineReady,
    /// A previous worker was controlling the page; a reload picks up the new
    /// content.
    UpdateAvailable,
}

impl Readiness {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::OfflineReady => "Content is cached for offline use.",
            Self::UpdateAvailable => "New content is available; please refresh.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub scope: String,
    pub install: InstallReport,
    pub activate: ActivateReport,
    pub readiness: Readiness,
    /// Number of previously registered workers that were unregistered.
    pub replaced: usize,
}

/// Holds at most one controlling [`OfflineWorker`] and routes page requests
/// through it.
pub struct WorkerRegistry {
    network: Arc<dyn Network>,
    current: RwLock<Option<Arc<OfflineWorker>>>,
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("controller", &self.controller())
            .finish_non_exhaustive()
    }
}

impl WorkerRegistry {
    /// `network` serves requests while no worker is controlling.
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self {
            network,
            current: RwLock::new(None),
        }
    }

    /// The worker currently controlling the scope, if any.
    #[must_use]
    pub fn controller(&self) -> Option<Arc<OfflineWorker>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Unregisters the controlling worker after letting its background
    /// refreshes finish. Returns how many workers were removed.
    pub async fn unregister_all(&self) -> usize {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match previous {
            Some(worker) => {
                worker.settle().await;
                tracing::debug!(bucket = worker.bucket(), "unregistered service worker");
                1
            }
            None => 0,
        }
    }

    /// Replaces any registered worker with `worker`, then installs and
    /// activates it.
    ///
    /// # Errors
    ///
    /// Returns the lifecycle error if install or activation fails. The error
    /// is also logged; the registry is left without a controller and keeps
    /// serving requests straight from the network.
    pub async fn register(&self, worker: OfflineWorker) -> Result<Registration, WorkerError> {
        let had_controller = self.controller().is_some();
        let replaced = self.unregister_all().await;

        let worker = Arc::new(worker);
        let (install, activate) = match Self::bring_up(&worker).await {
            Ok(reports) => reports,
            Err(e) => {
                tracing::error!(error = %e, bucket = worker.bucket(), "service worker registration failed");
                return Err(e);
            }
        };

        let readiness = if had_controller {
            Readiness::UpdateAvailable
        } else {
            Readiness::OfflineReady
        };
        tracing::info!(
            scope = SCOPE,
            bucket = worker.bucket(),
            seeds_cached = install.cached_count(),
            evicted = activate.evicted.len(),
            "service worker registration successful"
        );
        tracing::info!("{}", readiness.message());

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(worker);
        Ok(Registration {
            scope: SCOPE.to_owned(),
            install,
            activate,
            readiness,
            replaced,
        })
    }

    async fn bring_up(
        worker: &OfflineWorker,
    ) -> Result<(InstallReport, ActivateReport), WorkerError> {
        let install = worker.install().await?;
        let activate = worker.activate().await?;
        Ok((install, activate))
    }
}

#[async_trait]
impl Network for WorkerRegistry {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        match self.controller() {
            Some(worker) => worker.handle_fetch(request.clone()).await,
            None => self.network.fetch(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::network::DisconnectedNetwork;
    use crate::policy::CachePolicy;
    use crate::storage::{CacheStorage, MemoryCacheStorage};
    use crate::worker::WorkerState;
    use reqwest::Url;

    const ORIGIN: &str = "http://localhost:3000";

    struct ClosedStorage;

    #[async_trait]
    impl CacheStorage for ClosedStorage {
        async fn open(&self, _bucket: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("cache API disabled".to_owned()))
        }
        async fn keys(&self) -> Result<Vec<String>, StorageError> {
            Ok(Vec::new())
        }
        async fn delete(&self, _bucket: &str) -> Result<bool, StorageError> {
            Ok(false)
        }
        async fn get(
            &self,
            _bucket: &str,
            _key: &str,
        ) -> Result<Option<FetchResponse>, StorageError> {
            Ok(None)
        }
        async fn put(
            &self,
            _bucket: &str,
            _key: &str,
            _response: &FetchResponse,
        ) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn worker(storage: Arc<dyn CacheStorage>, version: &str) -> OfflineWorker {
        let policy = CachePolicy::new(Url::parse(ORIGIN).expect("origin"));
        OfflineWorker::new(storage, Arc::new(DisconnectedNetwork), policy, version)
    }

    fn get_locations() -> FetchRequest {
        FetchRequest::get(Url::parse(&format!("{ORIGIN}/api/locations")).expect("url"))
    }

    #[test]
    fn readiness_messages() {
        assert_eq!(
            Readiness::OfflineReady.message(),
            "Content is cached for offline use."
        );
        assert_eq!(
            Readiness::UpdateAvailable.message(),
            "New content is available; please refresh."
        );
    }

    #[tokio::test]
    async fn first_registration_is_offline_ready() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let registry = WorkerRegistry::new(Arc::new(DisconnectedNetwork));

        let registration = registry
            .register(worker(storage, "v1"))
            .await
            .expect("register");

        assert_eq!(registration.scope, "/");
        assert_eq!(registration.readiness, Readiness::OfflineReady);
        assert_eq!(registration.replaced, 0);
        let controller = registry.controller().expect("controller");
        assert_eq!(controller.state(), WorkerState::Active);
    }

    #[tokio::test]
    async fn re_registration_replaces_and_evicts_previous_version() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let registry = WorkerRegistry::new(Arc::new(DisconnectedNetwork));
        registry
            .register(worker(storage.clone(), "v1"))
            .await
            .expect("register v1");

        let registration = registry
            .register(worker(storage.clone(), "v2"))
            .await
            .expect("register v2");

        assert_eq!(registration.readiness, Readiness::UpdateAvailable);
        assert_eq!(registration.replaced, 1);
        assert_eq!(registration.activate.evicted, vec!["chargemap-cache-v1"]);
        assert_eq!(
            registry.controller().expect("controller").bucket(),
            "chargemap-cache-v2"
        );
        assert_eq!(storage.keys().await.unwrap(), vec!["chargemap-cache-v2"]);
    }

    #[tokio::test]
    async fn failed_registration_leaves_no_controller() {
        let registry = WorkerRegistry::new(Arc::new(DisconnectedNetwork));
        let err = registry
            .register(worker(Arc::new(ClosedStorage), "v1"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::Storage(_)));
        assert!(registry.controller().is_none());
        // Without a controller requests go straight to the network.
        assert!(registry.fetch(&get_locations()).await.is_err());
    }

    #[tokio::test]
    async fn controlled_requests_go_through_the_worker() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let registry = WorkerRegistry::new(Arc::new(DisconnectedNetwork));
        registry
            .register(worker(storage, "v1"))
            .await
            .expect("register");

        let response = registry.fetch(&get_locations()).await.expect("response");
        assert_eq!(response.status, 503);
        assert_eq!(response.text(), "Offline content");
    }

    #[tokio::test]
    async fn unregister_all_clears_controller() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let registry = WorkerRegistry::new(Arc::new(DisconnectedNetwork));
        registry
            .register(worker(storage, "v1"))
            .await
            .expect("register");

        assert_eq!(registry.unregister_all().await, 1);
        assert_eq!(registry.unregister_all().await, 0);
        assert!(registry.controller().is_none());
    }
}
