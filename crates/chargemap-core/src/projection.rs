//! Geographic-to-pixel projection for the map canvas.
//!
//! The projection is a plain linear mapping of the working set's bounding box
//! onto the drawable part of a fixed canvas. It is always fitted to the full,
//! unfiltered location set so that filtering never moves the remaining points.

use serde::Serialize;

use crate::locations::{Coordinates, Location};

/// Minimal lat/lon rectangle containing a location set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box used when there are no locations.
    pub const UNIT: BoundingBox = BoundingBox {
        min_lat: 0.0,
        max_lat: 1.0,
        min_lon: 0.0,
        max_lon: 1.0,
    };

    /// Computes the bounding box of `locations`, or [`BoundingBox::UNIT`] for
    /// an empty slice.
    #[must_use]
    pub fn from_locations(locations: &[Location]) -> Self {
        if locations.is_empty() {
            return Self::UNIT;
        }

        locations.iter().fold(
            BoundingBox {
                min_lat: f64::INFINITY,
                max_lat: f64::NEG_INFINITY,
                min_lon: f64::INFINITY,
                max_lon: f64::NEG_INFINITY,
            },
            |acc, location| {
                let Coordinates { lat, lon } = location.coordinates;
                BoundingBox {
                    min_lat: acc.min_lat.min(lat),
                    max_lat: acc.max_lat.max(lat),
                    min_lon: acc.min_lon.min(lon),
                    max_lon: acc.max_lon.max(lon),
                }
            },
        )
    }

    /// Latitude span; a degenerate (zero or non-finite) span counts as 1.
    #[must_use]
    pub fn lat_range(&self) -> f64 {
        non_degenerate(self.max_lat - self.min_lat)
    }

    /// Longitude span; a degenerate (zero or non-finite) span counts as 1.
    #[must_use]
    pub fn lon_range(&self) -> f64 {
        non_degenerate(self.max_lon - self.min_lon)
    }

    #[must_use]
    pub fn contains(&self, coordinates: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&coordinates.lat)
            && (self.min_lon..=self.max_lon).contains(&coordinates.lon)
    }
}

fn non_degenerate(range: f64) -> f64 {
    if range == 0.0 || !range.is_finite() {
        1.0
    } else {
        range
    }
}

/// Fixed-size drawing surface with a uniform padding margin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            padding: 40.0,
        }
    }
}

impl Canvas {
    fn drawable_width(&self) -> f64 {
        self.width - self.padding * 2.0
    }

    fn drawable_height(&self) -> f64 {
        self.height - self.padding * 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

/// A bounding box fitted onto a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    bounds: BoundingBox,
    canvas: Canvas,
    empty: bool,
}

impl Projection {
    /// Fits a projection to the full (unfiltered) working set.
    #[must_use]
    pub fn fit(locations: &[Location], canvas: Canvas) -> Self {
        Self {
            bounds: BoundingBox::from_locations(locations),
            canvas,
            empty: locations.is_empty(),
        }
    }

    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    #[must_use]
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Projects a position to canvas pixels. Higher latitudes map to smaller
    /// `y`. With an empty working set every position maps to the origin.
    #[must_use]
    pub fn project(&self, coordinates: Coordinates) -> PixelPoint {
        if self.empty {
            return PixelPoint { x: 0.0, y: 0.0 };
        }

        let b = &self.bounds;
        let x = (coordinates.lon - b.min_lon) / b.lon_range() * self.canvas.drawable_width()
            + self.canvas.padding;
        let y = (1.0 - (coordinates.lat - b.min_lat) / b.lat_range())
            * self.canvas.drawable_height()
            + self.canvas.padding;

        PixelPoint { x, y }
    }
}
