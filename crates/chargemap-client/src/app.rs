//! Page bootstrap: wires cache storage, network, the offline worker and the
//! loader from an [`AppConfig`].

use std::sync::Arc;
use std::time::Duration;

use chargemap_cache::{
    CachePolicy, CacheStorage, Connectivity, DisconnectedNetwork, DiskCacheStorage, HttpNetwork,
    Network, OfflineWorker, Registration, WorkerRegistry,
};
use chargemap_core::AppConfig;
use reqwest::Url;
use tokio::task::JoinHandle;

use crate::error::{LoadError, PageError};
use crate::loader::LocationLoader;
use crate::view::MapView;

/// Everything a page load needs, shared across loads.
pub struct PageContext {
    connectivity: Connectivity,
    storage: Arc<dyn CacheStorage>,
    registry: Arc<WorkerRegistry>,
    loader: LocationLoader,
    registration: Option<Registration>,
    search_delay: Duration,
}

impl PageContext {
    /// Builds the page from configuration: on-disk cache under
    /// `cache_dir`, a `reqwest` network (or a disconnected one when
    /// `start_offline` is set) and a registered offline worker.
    ///
    /// # Errors
    ///
    /// - [`PageError::Network`] if the HTTP client cannot be built.
    /// - [`PageError::Load`] if `api_base_url` is not a valid URL.
    pub async fn bootstrap(config: &AppConfig) -> Result<Self, PageError> {
        let storage: Arc<dyn CacheStorage> = Arc::new(DiskCacheStorage::new(&config.cache_dir));
        let connectivity = Connectivity::new(!config.start_offline);
        let network: Arc<dyn Network> = if config.start_offline {
            Arc::new(DisconnectedNetwork)
        } else {
            Arc::new(
                HttpNetwork::new(config.request_timeout_secs, &config.user_agent)
                    .map_err(PageError::Network)?
                    .with_connectivity(connectivity.clone()),
            )
        };
        Self::from_parts(config, storage, network, connectivity).await
    }

    /// Builds the page around caller-supplied storage and network.
    ///
    /// A worker registration failure is logged and the page carries on
    /// without offline support.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Load`] if `api_base_url` is not a valid URL.
    pub async fn from_parts(
        config: &AppConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        connectivity: Connectivity,
    ) -> Result<Self, PageError> {
        let origin = Url::parse(&config.api_base_url).map_err(|e| LoadError::InvalidUrl {
            url: config.api_base_url.clone(),
            reason: e.to_string(),
        })?;

        let registry = Arc::new(WorkerRegistry::new(Arc::clone(&network)));
        let worker = OfflineWorker::new(
            Arc::clone(&storage),
            network,
            CachePolicy::new(origin),
            &config.cache_version,
        );
        let registration = registry.register(worker).await.ok();

        let loader = LocationLoader::new(
            Arc::clone(&registry) as Arc<dyn Network>,
            Arc::clone(&storage),
            connectivity.clone(),
            &config.api_base_url,
        )?;

        Ok(Self {
            connectivity,
            storage,
            registry,
            loader,
            registration,
            search_delay: Duration::from_millis(config.search_debounce_ms),
        })
    }

    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn loader(&self) -> &LocationLoader {
        &self.loader
    }

    /// The worker registration, or `None` if it failed.
    #[must_use]
    pub fn registration(&self) -> Option<&Registration> {
        self.registration.as_ref()
    }

    /// Performs one page load and returns the resulting view.
    pub async fn load_view(&self) -> MapView {
        let mut view = MapView::new(self.search_delay);
        let result = self.loader.load().await;
        view.apply_load(result);
        view.set_offline(!self.connectivity.is_online());
        view
    }

    /// Logs connectivity changes for the lifetime of the context. Changes
    /// never trigger a re-fetch.
    #[must_use]
    pub fn spawn_connectivity_monitor(&self) -> JoinHandle<()> {
        let mut rx = self.connectivity.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                tracing::info!(online, "connectivity changed; keeping current working set");
            }
        })
    }

    /// Waits for in-flight background cache refreshes.
    pub async fn shutdown(&self) {
        if let Some(worker) = self.registry.controller() {
            worker.settle().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chargemap_cache::{FetchError, FetchRequest, FetchResponse, MemoryCacheStorage, WorkerState};
    use chargemap_core::Environment;

    use super::*;
    use crate::loader::SNAPSHOT_BUCKET;
    use crate::view::LoadState;

    fn config(offline: bool) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            api_base_url: "http://localhost:3000".to_owned(),
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "debug".to_owned(),
            cache_dir: PathBuf::from("unused"),
            cache_version: "v1".to_owned(),
            request_timeout_secs: 5,
            user_agent: "chargemap-test".to_owned(),
            search_debounce_ms: 300,
            start_offline: offline,
        }
    }

    #[tokio::test]
    async fn offline_page_reads_worker_bucket_after_activation() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let body = r#"{"locations":[{"locationId":7,"address":{"name":"Depot","street":"S","zipCode":"1","city":"C","countryISO":"BE"},"coordinates":{"lat":1.0,"lon":2.0},"connectorType":"CCS","maxPower":50,"public":true,"type":"fast"}]}"#;
        let key = "http://localhost:3000/api/locations";
        storage
            .put("chargemap-cache-v1", key, &FetchResponse::new(200, body))
            .await
            .expect("put");
        storage
            .put(SNAPSHOT_BUCKET, key, &FetchResponse::new(200, r#"{"locations":[]}"#))
            .await
            .expect("put");

        let page = PageContext::from_parts(
            &config(true),
            storage,
            Arc::new(DisconnectedNetwork),
            Connectivity::new(false),
        )
        .await
        .expect("page");

        let registration = page.registration().expect("registration survives failed seeds");
        assert_eq!(registration.install.cached_count(), 0);
        assert_eq!(registration.activate.evicted, vec![SNAPSHOT_BUCKET]);
        assert_eq!(
            page.registry().controller().expect("controller").state(),
            WorkerState::Active
        );

        let view = page.load_view().await;
        assert_eq!(view.load_state(), &LoadState::Ready);
        assert!(view.is_offline());
        assert_eq!(view.locations().len(), 1);
        assert_eq!(view.locations()[0].address.name, "Depot");
        page.shutdown().await;
    }

    #[tokio::test]
    async fn online_failure_surfaces_on_the_view() {
        // Online, but the network is down and nothing is cached: the worker
        // answers 503 and the load fails with that status.
        let page = PageContext::from_parts(
            &config(false),
            Arc::new(MemoryCacheStorage::new()),
            Arc::new(DisconnectedNetwork),
            Connectivity::new(true),
        )
        .await
        .expect("page");

        let view = page.load_view().await;
        match view.load_state() {
            LoadState::Failed(message) => assert!(message.contains("503"), "{message}"),
            other => panic!("expected failure, got {other:?}"),
        }
        page.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_base_url_is_rejected() {
        let mut config = config(false);
        config.api_base_url = "not a url".to_owned();
        let result = PageContext::from_parts(
            &config,
            Arc::new(MemoryCacheStorage::new()),
            Arc::new(DisconnectedNetwork),
            Connectivity::default(),
        )
        .await;
        assert!(matches!(result, Err(PageError::Load(LoadError::InvalidUrl { .. }))));
    }

    #[tokio::test]
    async fn bootstrap_offline_uses_disk_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = config(true);
        config.cache_dir = dir.path().to_path_buf();

        let page = PageContext::bootstrap(&config).await.expect("page");
        assert!(!page.connectivity().is_online());
        assert_eq!(
            page.storage().keys().await.expect("keys"),
            vec!["chargemap-cache-v1"]
        );

        let view = page.load_view().await;
        assert_eq!(view.load_state(), &LoadState::Ready);
        assert!(view.locations().is_empty());
    }

    struct CountingNetwork {
        body: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Network for CountingNetwork {
        async fn fetch(&self, _request: &FetchRequest) -> Result<FetchResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchResponse::new(200, self.body))
        }
    }

    #[tokio::test]
    async fn connectivity_changes_do_not_refetch() {
        let network = Arc::new(CountingNetwork {
            body: r#"{"locations":[{"locationId":1,"address":{"name":"Alpha","street":"S","zipCode":"1","city":"C","countryISO":"BE"},"coordinates":{"lat":1.0,"lon":2.0},"connectorType":"CCS","maxPower":50,"public":true,"type":"fast"}]}"#,
            calls: AtomicUsize::new(0),
        });
        let page = PageContext::from_parts(
            &config(false),
            Arc::new(MemoryCacheStorage::new()),
            network.clone(),
            Connectivity::new(true),
        )
        .await
        .expect("page");

        let view = page.load_view().await;
        page.shutdown().await;
        let calls_after_load = network.calls.load(Ordering::SeqCst);
        assert_eq!(view.locations().len(), 1);

        let monitor = page.spawn_connectivity_monitor();
        page.connectivity().set_online(false);
        tokio::task::yield_now().await;
        page.connectivity().set_online(true);
        tokio::time::sleep(Duration::from_millis(20)).await;
        page.shutdown().await;

        assert!(!monitor.is_finished());
        assert_eq!(network.calls.load(Ordering::SeqCst), calls_after_load);
        assert_eq!(view.locations().len(), 1);
        assert_eq!(view.locations()[0].address.name, "Alpha");
        assert!(!view.is_offline());
        monitor.abort();
    }
}
