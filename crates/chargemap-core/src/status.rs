//! Connector status normalization and display colours.

use serde::Serialize;

/// Status value used when a location reports none.
pub const UNKNOWN_STATUS: &str = "unknown";

/// Statuses offered by the status toggle group, in display order.
pub const TOGGLE_STATUSES: [&str; 3] = ["Available", "In Use", "Suspended"];

/// Display colour for a status: an `rgb(...)` fill and a utility class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusColor {
    pub rgb: &'static str,
    pub class: &'static str,
}

/// The statuses the map knows how to colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Available,
    InUse,
    Suspended,
    Unknown,
}

impl StatusKind {
    /// All kinds in legend order.
    pub const ALL: [StatusKind; 4] = [
        StatusKind::Available,
        StatusKind::InUse,
        StatusKind::Suspended,
        StatusKind::Unknown,
    ];

    /// Classifies a raw status. Matching is case-insensitive and ignores
    /// surrounding whitespace; unrecognized, empty or absent values are
    /// [`StatusKind::Unknown`].
    #[must_use]
    pub fn from_status(status: Option<&str>) -> Self {
        match status.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("available") => StatusKind::Available,
            Some("in use") => StatusKind::InUse,
            Some("suspended") => StatusKind::Suspended,
            _ => StatusKind::Unknown,
        }
    }

    #[must_use]
    pub fn color(self) -> StatusColor {
        match self {
            StatusKind::Available => StatusColor {
                rgb: "rgb(34, 197, 94)",
                class: "bg-green-500",
            },
            StatusKind::InUse => StatusColor {
                rgb: "rgb(59, 130, 246)",
                class: "bg-blue-500",
            },
            StatusKind::Suspended => StatusColor {
                rgb: "rgb(239, 68, 68)",
                class: "bg-red-500",
            },
            StatusKind::Unknown => StatusColor {
                rgb: "rgb(107, 114, 128)",
                class: "bg-gray-500",
            },
        }
    }

    /// Legend label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StatusKind::Available => "Available",
            StatusKind::InUse => "In Use",
            StatusKind::Suspended => "Suspended",
            StatusKind::Unknown => "Unknown",
        }
    }
}

/// Colour for a raw status string.
#[must_use]
pub fn status_color(status: Option<&str>) -> StatusColor {
    StatusKind::from_status(status).color()
}

/// Text shown in the detail panel: the raw status, or `"Unknown"`.
#[must_use]
pub fn status_text(status: Option<&str>) -> &str {
    match status {
        Some(s) if !s.is_empty() => s,
        _ => "Unknown",
    }
}

/// Normalized status used by the status filter: lowercased and trimmed,
/// `"unknown"` when absent or blank.
#[must_use]
pub fn normalize_status(status: Option<&str>) -> String {
    match status.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => UNKNOWN_STATUS.to_owned(),
    }
}
