//! Fixed spatial geometry of the satellite product grid.
//! Coordinates are f64 degrees; row 0 is the northernmost row.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::Shape;

/// CRS of the geographic (lat/lon) projection the product is tailored to.
pub const GEOGRAPHIC_CRS: &str = "EPSG:4326";

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub west: f64,
    pub east: f64,
}

impl Bounds {
    /// The Morocco region of interest used when ordering the product (NSWE).
    pub const MOROCCO: Bounds = Bounds {
        north: 38.0,
        south: 20.0,
        west: -20.0,
        east: 0.0,
    };
}

/// Cell-centre coordinates of every row and column of the product grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub crs: String,
    /// Latitude of each row, north first.
    pub lats: Vec<f64>,
    /// Longitude of each column, west first.
    pub lons: Vec<f64>,
}

impl GridGeometry {
    pub fn new(crs: impl Into<String>, lats: Vec<f64>, lons: Vec<f64>) -> Result<Self, ConfigError> {
        if lats.is_empty() || lons.is_empty() {
            return Err(ConfigError::InvalidGrid("grid has no rows or no columns".into()));
        }
        if lats.iter().chain(lons.iter()).any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidGrid("non-finite coordinate".into()));
        }
        Ok(Self { crs: crs.into(), lats, lons })
    }

    /// Regular grid of `shape` cells spanning `bounds`, coordinates at cell centres.
    pub fn regular(shape: Shape, bounds: Bounds, crs: impl Into<String>) -> Result<Self, ConfigError> {
        if bounds.north <= bounds.south || bounds.east <= bounds.west {
            return Err(ConfigError::InvalidGrid(format!("degenerate bounds {bounds:?}")));
        }
        let dlat = (bounds.north - bounds.south) / shape.height as f64;
        let dlon = (bounds.east - bounds.west) / shape.width as f64;
        let lats = (0..shape.height)
            .map(|r| bounds.north - (r as f64 + 0.5) * dlat)
            .collect();
        let lons = (0..shape.width)
            .map(|c| bounds.west + (c as f64 + 0.5) * dlon)
            .collect();
        Self::new(crs, lats, lons)
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.lons.len(), self.lats.len())
    }

    /// (lon, lat) of the centre of cell (row, col).
    #[inline]
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (self.lons[col], self.lats[row])
    }
}
