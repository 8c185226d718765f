//! Domain mask: which product-grid cells lie inside the region of interest.
//!
//! Built once per run from the region boundary and the product grid geometry,
//! then shared read-only by every scene classification.

use std::fs;
use std::path::Path;

use geo::{BoundingRect, Contains, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::GridGeometry;
use crate::grid::{Grid, Shape};

/// One polygon ring set as `[lon, lat]` pairs. Rings are closed implicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonRings {
    pub exterior: Vec<[f64; 2]>,
    #[serde(default)]
    pub interiors: Vec<Vec<[f64; 2]>>,
}

/// Region boundary as supplied by the external polygon parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionBoundary {
    pub crs: String,
    pub polygons: Vec<PolygonRings>,
}

impl RegionBoundary {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Union of all polygons, after checking every ring is usable.
    pub fn to_multi_polygon(&self) -> Result<MultiPolygon<f64>, ConfigError> {
        if self.polygons.is_empty() {
            return Err(ConfigError::EmptyBoundary);
        }
        let polygons = self
            .polygons
            .iter()
            .enumerate()
            .map(|(index, p)| -> Result<Polygon<f64>, ConfigError> {
                let exterior = ring(&p.exterior).map_err(|reason| ConfigError::InvalidPolygon {
                    index,
                    reason: format!("exterior: {reason}"),
                })?;
                let interiors = p
                    .interiors
                    .iter()
                    .map(|r| ring(r))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|reason| ConfigError::InvalidPolygon {
                        index,
                        reason: format!("interior: {reason}"),
                    })?;
                Ok(Polygon::new(exterior, interiors))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MultiPolygon::new(polygons))
    }
}

fn ring(points: &[[f64; 2]]) -> Result<LineString<f64>, String> {
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err("non-finite coordinate".into());
    }
    let mut distinct: Vec<[f64; 2]> = points.to_vec();
    if distinct.len() > 1 && distinct.first() == distinct.last() {
        distinct.pop();
    }
    if distinct.len() < 3 {
        return Err(format!("{} distinct vertices, need at least 3", distinct.len()));
    }
    Ok(LineString::from(
        distinct.into_iter().map(|[x, y]| (x, y)).collect::<Vec<_>>(),
    ))
}

/// Boolean grid, `true` where the cell centre lies strictly inside the region.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainMask {
    grid: Grid<bool>,
}

impl DomainMask {
    /// Rasterise `boundary` onto `geometry`.
    ///
    /// Fails if the CRS strings differ or the boundary is empty. A boundary
    /// that covers no cell centre is reported as empty too, since every
    /// scene would then classify as no-data.
    pub fn build(boundary: &RegionBoundary, geometry: &GridGeometry) -> Result<Self, ConfigError> {
        if !boundary.crs.eq_ignore_ascii_case(&geometry.crs) {
            return Err(ConfigError::CrsMismatch {
                boundary: boundary.crs.clone(),
                grid: geometry.crs.clone(),
            });
        }
        let region = boundary.to_multi_polygon()?;
        let bbox = region.bounding_rect().ok_or(ConfigError::EmptyBoundary)?;
        let (min, max) = (bbox.min(), bbox.max());

        let shape = geometry.shape();
        let mut grid = Grid::filled(shape, false);
        for r in 0..shape.height {
            for c in 0..shape.width {
                let (lon, lat) = geometry.cell_center(r, c);
                if lon < min.x || lon > max.x || lat < min.y || lat > max.y {
                    continue;
                }
                if region.contains(&Point::new(lon, lat)) {
                    grid.set(r, c, true);
                }
            }
        }

        let mask = Self { grid };
        if mask.count_inside() == 0 {
            return Err(ConfigError::EmptyBoundary);
        }
        log::info!(
            "domain mask: {} of {} cells inside region ({})",
            mask.count_inside(),
            shape.len(),
            boundary.crs
        );
        Ok(mask)
    }

    /// Use a precomputed mask grid as-is.
    pub fn from_grid(grid: Grid<bool>) -> Self {
        Self { grid }
    }

    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        *self.grid.get(row, col)
    }

    pub fn shape(&self) -> Shape {
        self.grid.shape()
    }

    pub fn grid(&self) -> &Grid<bool> {
        &self.grid
    }

    pub fn count_inside(&self) -> usize {
        self.grid.data.iter().filter(|&&inside| inside).count()
    }
}
