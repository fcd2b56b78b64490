//! The map page: loads the working set through the offline worker, holds the
//! view state and renders it.

pub mod app;
pub mod error;
pub mod loader;
pub mod render;
pub mod view;

pub use app::PageContext;
pub use error::{LoadError, PageError};
pub use loader::{LoadOutcome, LoadSource, LocationLoader, LOCATIONS_PATH, SNAPSHOT_BUCKET};
pub use render::{escape, render_page, render_svg};
pub use view::{LegendEntry, LoadState, LocationDetail, MapPoint, MapView};
