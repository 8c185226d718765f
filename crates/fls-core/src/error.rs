//! Error taxonomy.
//!
//! `SceneError` is per-scene and recoverable: the run skips the scene and
//! carries on. `ConfigError` is raised while setting up a run (boundary,
//! grid geometry, config files) and is fatal.

use thiserror::Error;

use crate::grid::Shape;
use crate::scene::Channel;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: Shape, found: Shape },

    #[error("missing channel {0}")]
    MissingChannel(Channel),

    #[error("hour {hour:02} UTC is outside the nighttime window")]
    OutOfWindow { hour: u32 },

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Which per-scene failure occurred, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipKind {
    ShapeMismatch,
    MissingChannel,
    OutOfWindow,
    InvalidTimestamp,
}

impl SceneError {
    pub fn kind(&self) -> SkipKind {
        match self {
            SceneError::ShapeMismatch { .. } => SkipKind::ShapeMismatch,
            SceneError::MissingChannel(_) => SkipKind::MissingChannel,
            SceneError::OutOfWindow { .. } => SkipKind::OutOfWindow,
            SceneError::InvalidTimestamp(_) => SkipKind::InvalidTimestamp,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CRS mismatch: boundary is {boundary}, grid is {grid}")]
    CrsMismatch { boundary: String, grid: String },

    #[error("region boundary contains no polygon")]
    EmptyBoundary,

    #[error("invalid polygon #{index}: {reason}")]
    InvalidPolygon { index: usize, reason: String },

    #[error("invalid grid geometry: {0}")]
    InvalidGrid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("mask is {mask}, geometry is {geometry}")]
    ShapeMismatch { mask: Shape, geometry: Shape },
}
