//! Run configuration: product grid, paths, thresholds and rendering options.
//! Loaded from JSON; missing keys fall back to the built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::BtdThresholds;
use crate::error::ConfigError;
use crate::geometry::{Bounds, GridGeometry, GEOGRAPHIC_CRS};
use crate::grid::Shape;
use crate::rgb::RgbOptions;

/// Product grid description. Cell centres are derived from `bounds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    pub bounds: Bounds,
    pub crs: String,
}

impl Default for GridConfig {
    /// 0.05° lat/lon grid over the Morocco window (N38 S20 W-20 E0).
    fn default() -> Self {
        Self {
            width: 400,
            height: 360,
            bounds: Bounds::MOROCCO,
            crs: GEOGRAPHIC_CRS.to_string(),
        }
    }
}

impl GridConfig {
    pub fn geometry(&self) -> Result<GridGeometry, ConfigError> {
        GridGeometry::regular(Shape::new(self.width, self.height), self.bounds, self.crs.clone())
    }
}

/// Settings for one climatology run. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory of decoded scene records (`*.json`).
    pub scenes_dir: PathBuf,
    /// Region boundary JSON.
    pub boundary: PathBuf,
    /// Where the `MMhh.txt` summaries are written.
    pub output_dir: PathBuf,
    pub grid: GridConfig,
    pub thresholds: BtdThresholds,
    /// Where per-scene fog RGB images are written.
    pub images_dir: PathBuf,
    pub rgb: RgbOptions,
    /// flexi_logger spec, e.g. `info` or `fls_core=debug`.
    pub log_level: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scenes_dir: PathBuf::from("data/scenes"),
            boundary: PathBuf::from("data/morocco_boundary.json"),
            output_dir: PathBuf::from("data/synthese"),
            grid: GridConfig::default(),
            thresholds: BtdThresholds::default(),
            images_dir: PathBuf::from("data/images"),
            rgb: RgbOptions::default(),
            log_level: "info".to_string(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
