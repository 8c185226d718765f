//! Brightness-temperature-difference (BTD) fog and low stratus test.
//!
//! Per pixel, with `d1 = IR10.8 − IR3.9` and `d2 = IR12.0 − IR10.8`:
//!   FLS    iff d1 ∈ [d1_min, d1_max] and d2 ∈ [d2_min, d2_max] (inclusive)
//!   CLEAR  otherwise
//!   NO_DATA outside the domain mask or where any channel is missing.

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::grid::Grid;
use crate::mask::DomainMask;
use crate::night::BucketKey;
use crate::scene::{Channel, Scene};

/// Per-pixel classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Fls,
    Clear,
    NoData,
}

/// Inclusive BTD bounds in kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BtdThresholds {
    pub d1_min: f64,
    pub d1_max: f64,
    pub d2_min: f64,
    pub d2_max: f64,
    /// Optional warm-top filter on IR10.8 (K). Off by default.
    pub ir10_8_range: Option<[f64; 2]>,
}

impl Default for BtdThresholds {
    fn default() -> Self {
        Self {
            d1_min: 4.5,
            d1_max: 9.0,
            d2_min: -2.0,
            d2_max: 2.0,
            ir10_8_range: None,
        }
    }
}

impl BtdThresholds {
    /// BTD test alone, on precomputed differences.
    #[inline]
    pub fn classify_btd(&self, d1: f64, d2: f64) -> Category {
        if (self.d1_min..=self.d1_max).contains(&d1) && (self.d2_min..=self.d2_max).contains(&d2) {
            Category::Fls
        } else {
            Category::Clear
        }
    }

    /// Classify one valid pixel from its three brightness temperatures.
    #[inline]
    pub fn classify_pixel(&self, ir3_9: f32, ir10_8: f32, ir12_0: f32) -> Category {
        let (t39, t108, t120) = (ir3_9 as f64, ir10_8 as f64, ir12_0 as f64);
        if let Some([lo, hi]) = self.ir10_8_range {
            if !(lo..=hi).contains(&t108) {
                return Category::Clear;
            }
        }
        self.classify_btd(t108 - t39, t120 - t108)
    }
}

/// Default-threshold BTD test on precomputed differences.
pub fn classify_btd(d1: f64, d2: f64) -> Category {
    BtdThresholds::default().classify_btd(d1, d2)
}

/// Per-category pixel totals of one classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub fls: usize,
    pub clear: usize,
    pub no_data: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationGrid {
    pub grid: Grid<Category>,
}

impl ClassificationGrid {
    pub fn counts(&self) -> CategoryCounts {
        self.grid.data.iter().fold(CategoryCounts::default(), |mut acc, c| {
            match c {
                Category::Fls => acc.fls += 1,
                Category::Clear => acc.clear += 1,
                Category::NoData => acc.no_data += 1,
            }
            acc
        })
    }
}

/// Classify a scene against the domain mask.
///
/// Rejects daytime scenes with `OutOfWindow` and scenes whose grid differs
/// from the mask with `ShapeMismatch`. Otherwise pure and per-pixel.
pub fn classify_scene(
    scene: &Scene,
    mask: &DomainMask,
    thresholds: &BtdThresholds,
) -> Result<ClassificationGrid, SceneError> {
    BucketKey::from_timestamp(scene.timestamp)?;
    let shape = mask.shape();
    for ch in Channel::ALL {
        scene.channel(ch).ensure_shape(shape)?;
    }

    let t39 = &scene.channel(Channel::Ir3_9).data;
    let t108 = &scene.channel(Channel::Ir10_8).data;
    let t120 = &scene.channel(Channel::Ir12_0).data;

    let data = mask
        .grid()
        .data
        .iter()
        .enumerate()
        .map(|(i, &inside)| {
            // Single no-data guard: nothing below sees a sentinel or NaN.
            if !inside || scene.is_no_data(t39[i]) || scene.is_no_data(t108[i]) || scene.is_no_data(t120[i]) {
                return Category::NoData;
            }
            thresholds.classify_pixel(t39[i], t108[i], t120[i])
        })
        .collect();

    Ok(ClassificationGrid {
        grid: Grid { width: shape.width, height: shape.height, data },
    })
}
