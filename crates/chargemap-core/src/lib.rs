pub mod app_config;
pub mod config;
pub mod debounce;
pub mod filter;
pub mod locations;
pub mod projection;
pub mod status;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use filter::FilterState;
pub use locations::{Address, Coordinates, Location, LocationId, LocationsResponse};
pub use projection::{BoundingBox, Canvas, PixelPoint, Projection};
pub use status::{normalize_status, status_color, status_text, StatusColor, StatusKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
