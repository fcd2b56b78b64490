use thiserror::Error;

use chargemap_cache::FetchError;

/// Errors that fail the initial locations load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch locations: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to fetch locations: unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API base URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Errors from bootstrapping a page.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("network setup failed: {0}")]
    Network(#[source] FetchError),
}
