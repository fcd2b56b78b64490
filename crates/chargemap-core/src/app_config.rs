use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    /// Origin of the locations API; also the origin the offline cache treats
    /// as same-origin.
    pub api_base_url: String,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub cache_dir: PathBuf,
    /// Version tag embedded in the worker's cache bucket name.
    pub cache_version: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub search_debounce_ms: u64,
    /// Connectivity assumed at startup.
    pub start_offline: bool,
}
