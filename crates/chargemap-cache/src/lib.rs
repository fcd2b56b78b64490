//! Offline cache manager: a request-intercepting, stale-while-revalidate cache
//! in front of the network, backed by named cache buckets.

pub mod connectivity;
pub mod error;
pub mod http;
pub mod network;
pub mod policy;
pub mod registry;
pub mod storage;
pub mod worker;

pub use connectivity::Connectivity;
pub use error::{FetchError, StorageError, WorkerError};
pub use http::{FetchRequest, FetchResponse};
pub use network::{DisconnectedNetwork, HttpNetwork, Network};
pub use policy::CachePolicy;
pub use registry::{Readiness, Registration, WorkerRegistry};
pub use storage::{CacheStorage, DiskCacheStorage, MemoryCacheStorage};
pub use worker::{
    bucket_name, ActivateReport, InstallReport, OfflineWorker, SeedOutcome, WorkerState,
    DEFAULT_SEED_PATHS,
};
