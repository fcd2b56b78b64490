//! Integration tests for the offline worker against a real HTTP network
//! (wiremock) and on-disk cache storage.

use std::sync::Arc;

use chargemap_cache::{
    CachePolicy, CacheStorage, Connectivity, DiskCacheStorage, FetchRequest, HttpNetwork,
    Network, OfflineWorker, Readiness, WorkerRegistry,
};
use reqwest::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn locations_body() -> serde_json::Value {
    serde_json::json!({
        "locations": [{
            "locationId": 1,
            "address": {
                "name": "Alpha",
                "street": "Main St 1",
                "zipCode": "10115",
                "city": "Berlin",
                "countryISO": "DE"
            },
            "coordinates": { "lat": 52.52, "lon": 13.40 },
            "connectorType": "CCS",
            "status": "Available",
            "maxPower": 150.0,
            "public": true,
            "type": "fast"
        }]
    })
}

async fn mount_origin(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>map</html>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locations_body()))
        .mount(server)
        .await;
}

fn network(connectivity: &Connectivity) -> Arc<dyn Network> {
    Arc::new(
        HttpNetwork::new(5, "chargemap-test/0.1")
            .expect("client construction should not fail")
            .with_connectivity(connectivity.clone()),
    )
}

#[tokio::test]
async fn seeded_cache_answers_after_origin_goes_away() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Not pooled, so dropping it shuts the listener down.
    let server = MockServer::builder().start().await;
    mount_origin(&server).await;
    let origin = Url::parse(&server.uri()).expect("origin");
    let locations_url = origin.join("/api/locations").expect("url");

    let connectivity = Connectivity::new(true);
    let network = network(&connectivity);
    let storage: Arc<dyn CacheStorage> = Arc::new(DiskCacheStorage::new(dir.path()));
    let registry = WorkerRegistry::new(Arc::clone(&network));
    let worker = OfflineWorker::new(
        Arc::clone(&storage),
        Arc::clone(&network),
        CachePolicy::new(origin.clone()),
        "v1",
    );

    let registration = registry.register(worker).await.expect("register");
    assert_eq!(registration.readiness, Readiness::OfflineReady);
    assert_eq!(registration.install.cached_count(), 2);

    drop(server);

    let response = registry
        .fetch(&FetchRequest::get(locations_url))
        .await
        .expect("worker answers cacheable requests");
    assert_eq!(response.status, 200);
    let body: serde_json::Value = response.parse_json().expect("json body");
    assert_eq!(body["locations"][0]["address"]["name"], "Alpha");

    registry.controller().expect("controller").settle().await;
}

#[tokio::test]
async fn uncached_request_while_offline_gets_placeholder() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Nothing listens on the discard port.
    let origin = Url::parse("http://127.0.0.1:9").expect("origin");

    let connectivity = Connectivity::new(true);
    let network = network(&connectivity);
    let storage: Arc<dyn CacheStorage> = Arc::new(DiskCacheStorage::new(dir.path()));
    let worker = OfflineWorker::new(storage, network, CachePolicy::new(origin.clone()), "v1");
    let install = worker.install().await.expect("seed failures do not fail install");
    assert_eq!(install.cached_count(), 0);
    worker.activate().await.expect("activate");
    assert!(!connectivity.is_online(), "refused connection marks offline");

    let response = worker
        .handle_fetch(FetchRequest::get(origin.join("/api/other").expect("url")))
        .await
        .expect("placeholder instead of error");
    assert_eq!(response.status, 503);
    assert_eq!(response.text(), "Offline content");
}

#[tokio::test]
async fn background_refresh_updates_disk_entry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .mount(&server)
        .await;
    let origin = Url::parse(&server.uri()).expect("origin");
    let locations_url = origin.join("/api/locations").expect("url");

    let storage = Arc::new(DiskCacheStorage::new(dir.path()));
    storage
        .put(
            "chargemap-cache-v1",
            locations_url.as_str(),
            &chargemap_cache::FetchResponse::new(200, "stale"),
        )
        .await
        .expect("seed entry");

    let network = network(&Connectivity::default());
    let worker = OfflineWorker::new(storage.clone(), network, CachePolicy::new(origin), "v1")
        .with_seeds(Vec::new());
    worker.install().await.expect("install");
    worker.activate().await.expect("activate");

    let first = worker
        .handle_fetch(FetchRequest::get(locations_url.clone()))
        .await
        .expect("response");
    assert_eq!(first.text(), "stale");

    worker.settle().await;
    let stored = storage
        .get("chargemap-cache-v1", locations_url.as_str())
        .await
        .expect("get")
        .expect("entry");
    assert_eq!(stored.text(), "fresh");
}

#[tokio::test]
async fn non_get_is_not_intercepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/locations"))
        .respond_with(ResponseTemplate::new(405))
        .expect(1)
        .mount(&server)
        .await;
    let origin = Url::parse(&server.uri()).expect("origin");

    let network = network(&Connectivity::default());
    let storage = Arc::new(DiskCacheStorage::new(dir.path()));
    let worker = OfflineWorker::new(storage.clone(), network, CachePolicy::new(origin.clone()), "v1")
        .with_seeds(Vec::new());
    worker.install().await.expect("install");
    worker.activate().await.expect("activate");

    let request = FetchRequest::new(
        reqwest::Method::POST,
        origin.join("/api/locations").expect("url"),
    );
    let response = worker.handle_fetch(request).await.expect("response");
    assert_eq!(response.status, 405);
    worker.settle().await;
    assert!(storage
        .get("chargemap-cache-v1", origin.join("/api/locations").expect("url").as_str())
        .await
        .expect("get")
        .is_none());
}
