//! Fog and low stratus (FLS) detection and nighttime climatology from
//! geostationary infrared scenes.
//!
//! Pipeline per scene: domain mask → BTD classification → (month, hour)
//! accumulation. After the last scene the accumulator is finalized into a
//! read-only [`Climatology`] that the exporters read from.

pub mod accumulator;
pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod frequency;
pub mod geometry;
pub mod grid;
pub mod mask;
pub mod night;
pub mod pipeline;
pub mod radiance;
pub mod rgb;
pub mod scene;

pub use accumulator::{AccumulatorBucket, Climatology, TemporalAccumulator};
pub use classify::{classify_btd, classify_scene, BtdThresholds, Category, ClassificationGrid};
pub use config::{GridConfig, RunConfig};
pub use error::{ConfigError, ExportError, SceneError, SkipKind};
pub use frequency::FrequencyMap;
pub use geometry::{Bounds, GridGeometry};
pub use grid::{Grid, Shape};
pub use mask::{DomainMask, RegionBoundary};
pub use night::BucketKey;
pub use pipeline::{ClimatologyRun, SkipReport};
pub use rgb::{fog_composite, RgbOptions};
pub use scene::{Channel, Scene, SceneRecord};
