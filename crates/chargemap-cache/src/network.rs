//! The network seam: anything that turns a [`FetchRequest`] into a
//! [`FetchResponse`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::connectivity::Connectivity;
use crate::error::FetchError;
use crate::http::{FetchRequest, FetchResponse};

#[async_trait]
pub trait Network: Send + Sync {
    /// Performs the request.
    ///
    /// A non-2xx status is a successful fetch; `Err` means no response was
    /// obtained at all (connection refused, timeout, DNS failure, ...).
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// [`Network`] for a device with no connection: every fetch fails with
/// [`FetchError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedNetwork;

#[async_trait]
impl Network for DisconnectedNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        Err(FetchError::Unavailable {
            url: request.url.to_string(),
        })
    }
}

/// [`Network`] backed by a `reqwest` client.
///
/// When a [`Connectivity`] handle is attached, connection-level failures mark
/// it offline and any received response marks it online again.
pub struct HttpNetwork {
    client: Client,
    connectivity: Option<Connectivity>,
}

impl HttpNetwork {
    /// Creates an `HttpNetwork` with the given request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            connectivity: None,
        })
    }

    #[must_use]
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    fn report(&self, online: bool) {
        if let Some(connectivity) = &self.connectivity {
            connectivity.set_online(online);
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let response = match self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                if err.is_connect() || err.is_timeout() {
                    self.report(false);
                }
                tracing::debug!(url = %request.url, error = %err, "network fetch failed");
                return Err(FetchError::Http(err));
            }
        };
        self.report(true);

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            headers,
            body,
        })
    }
}
