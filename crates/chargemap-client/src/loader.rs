use std::sync::Arc;

use chargemap_cache::{CacheStorage, Connectivity, FetchRequest, FetchResponse, Network};
use chargemap_core::{Location, LocationsResponse};
use reqwest::Url;

use crate::error::LoadError;

/// Path of the locations endpoint on the API origin.
pub const LOCATIONS_PATH: &str = "/api/locations";

/// Bucket holding the page's own snapshot of the last successful load.
pub const SNAPSHOT_BUCKET: &str = "chargemap-locations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Network,
    Snapshot,
    /// Offline with no snapshot anywhere.
    Empty,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub locations: Vec<Location>,
    pub source: LoadSource,
}

/// Loads the working set: network-first while online, cached snapshot while
/// offline.
pub struct LocationLoader {
    network: Arc<dyn Network>,
    storage: Arc<dyn CacheStorage>,
    connectivity: Connectivity,
    endpoint: Url,
}

impl LocationLoader {
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidUrl`] if `api_base_url` is not an absolute
    /// URL.
    pub fn new(
        network: Arc<dyn Network>,
        storage: Arc<dyn CacheStorage>,
        connectivity: Connectivity,
        api_base_url: &str,
    ) -> Result<Self, LoadError> {
        let endpoint = Url::parse(api_base_url)
            .and_then(|base| base.join(LOCATIONS_PATH))
            .map_err(|e| LoadError::InvalidUrl {
                url: api_base_url.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            network,
            storage,
            connectivity,
            endpoint,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Performs the initial load. Connectivity is checked once, up front.
    ///
    /// Online, the endpoint is fetched once (no retry) and a snapshot of the
    /// response is written on a best-effort basis. Offline, the snapshot is
    /// read instead; a missing snapshot is an empty working set, not an error.
    ///
    /// # Errors
    ///
    /// - [`LoadError::Fetch`] if the network produced no response.
    /// - [`LoadError::UnexpectedStatus`] for any non-2xx response.
    /// - [`LoadError::Deserialize`] if the payload (live or cached) does not
    ///   match `{ "locations": [...] }`.
    pub async fn load(&self) -> Result<LoadOutcome, LoadError> {
        if self.connectivity.is_online() {
            self.load_from_network().await
        } else {
            tracing::info!(endpoint = %self.endpoint, "offline; reading cached locations");
            self.load_from_snapshot().await
        }
    }

    async fn load_from_network(&self) -> Result<LoadOutcome, LoadError> {
        let request = FetchRequest::get(self.endpoint.clone());
        let response = self.network.fetch(&request).await?;
        if !response.is_success() {
            return Err(LoadError::UnexpectedStatus {
                status: response.status,
                url: self.endpoint.to_string(),
            });
        }

        let data = self.parse(&response)?;
        tracing::info!(count = data.locations.len(), "fetched locations");
        self.write_snapshot(&response).await;
        Ok(LoadOutcome {
            locations: data.locations,
            source: LoadSource::Network,
        })
    }

    async fn write_snapshot(&self, response: &FetchResponse) {
        let snapshot = FetchResponse::new(200, response.body.clone())
            .with_header("content-type", "application/json");
        if let Err(e) = self
            .storage
            .put(SNAPSHOT_BUCKET, self.endpoint.as_str(), &snapshot)
            .await
        {
            tracing::error!(error = %e, bucket = SNAPSHOT_BUCKET, "cache error");
        }
    }

    async fn load_from_snapshot(&self) -> Result<LoadOutcome, LoadError> {
        let Some(cached) = self.match_any_bucket().await else {
            tracing::info!("no cached locations available");
            return Ok(LoadOutcome {
                locations: Vec::new(),
                source: LoadSource::Empty,
            });
        };
        let data = self.parse(&cached)?;
        Ok(LoadOutcome {
            locations: data.locations,
            source: LoadSource::Snapshot,
        })
    }

    /// Looks the endpoint up in the snapshot bucket first, then in every
    /// other bucket (the offline worker's included). Storage errors are
    /// logged and treated as a miss.
    async fn match_any_bucket(&self) -> Option<FetchResponse> {
        let key = self.endpoint.as_str();
        let mut buckets = match self.storage.keys().await {
            Ok(buckets) => buckets,
            Err(e) => {
                tracing::error!(error = %e, "cache error");
                return None;
            }
        };
        buckets.sort_by_key(|name| name != SNAPSHOT_BUCKET);

        for bucket in &buckets {
            match self.storage.get(bucket, key).await {
                Ok(Some(hit)) if hit.is_success() => return Some(hit),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, %bucket, "cache error"),
            }
        }
        None
    }

    fn parse(&self, response: &FetchResponse) -> Result<LocationsResponse, LoadError> {
        response
            .parse_json()
            .map_err(|source| LoadError::Deserialize {
                context: self.endpoint.to_string(),
                source,
            })
    }
}
