use thiserror::Error;

use crate::worker::WorkerState;

/// Errors returned when a request could not produce a response at all.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The network is unreachable (used by offline-aware `Network` impls).
    #[error("network unavailable for {url}")]
    Unavailable { url: String },
}

/// Errors from a cache storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache entry serialization error for {context}: {source}")]
    Serialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid cache bucket name \"{0}\"")]
    InvalidBucket(String),

    #[error("cache storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the worker lifecycle.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid worker transition from {from:?} to {to:?}")]
    InvalidTransition { from: WorkerState, to: WorkerState },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
