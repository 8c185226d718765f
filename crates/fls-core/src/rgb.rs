//! Nighttime fog RGB composite for visual inspection of single scenes.
//!
//!   red   = IR12.0 − IR10.8
//!   green = IR10.8 − IR3.9
//!   blue  = IR10.8
//!
//! Each component is stretched linearly onto 0..=255 and clamped. Pixels
//! outside the domain mask are white; in-domain pixels with a missing
//! channel are black.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::grid::Grid;
use crate::mask::DomainMask;
use crate::night::BucketKey;
use crate::scene::{Channel, Scene};

pub type Rgb = [u8; 3];

pub const OUTSIDE_DOMAIN: Rgb = [255, 255, 255];
pub const MISSING: Rgb = [0, 0, 0];

/// Fixed stretch ranges in kelvin, per component.
pub const FIXED_RED: [f64; 2] = [-10.0, 5.0];
pub const FIXED_GREEN: [f64; 2] = [-20.0, 15.0];
pub const FIXED_BLUE: [f64; 2] = [210.0, 300.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stretch {
    /// Per-scene range between two percentiles of the valid values.
    Percentile { low: f64, high: f64 },
    /// `FIXED_RED`, `FIXED_GREEN` and `FIXED_BLUE`.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RgbOptions {
    pub stretch: Stretch,
    /// Applied to the 8-bit components after stretching.
    pub gamma: Option<f64>,
}

impl Default for RgbOptions {
    fn default() -> Self {
        Self {
            stretch: Stretch::Percentile { low: 1.0, high: 99.0 },
            gamma: Some(0.9),
        }
    }
}

/// `YYYYMMDDhh_RGB_FOG_Morocco.png`
pub fn rgb_file_name(timestamp: DateTime<Utc>) -> String {
    format!("{}_RGB_FOG_Morocco.png", timestamp.format("%Y%m%d%H"))
}

/// Linear-interpolated percentile (`p` in percent) of an ascending slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (p / 100.0).clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(last);
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

fn stretch_range(values: &[Option<f64>], stretch: Stretch, fixed: [f64; 2]) -> [f64; 2] {
    match stretch {
        Stretch::Fixed => fixed,
        Stretch::Percentile { low, high } => {
            let mut valid: Vec<f64> = values.iter().flatten().copied().collect();
            valid.sort_by(f64::total_cmp);
            match (percentile(&valid, low), percentile(&valid, high)) {
                (Some(lo), Some(hi)) => [lo, hi],
                _ => fixed,
            }
        }
    }
}

/// Map `v` onto 0..=255, truncating. A degenerate range maps everything to 0.
fn to_byte(v: f64, [lo, hi]: [f64; 2], gamma: Option<f64>) -> u8 {
    let span = hi - lo;
    let unit = if span > 0.0 { ((v - lo) / span).clamp(0.0, 1.0) } else { 0.0 };
    let byte = (unit * 255.0) as u8;
    match gamma {
        Some(g) => ((byte as f64 / 255.0).powf(g) * 255.0) as u8,
        None => byte,
    }
}

/// Build the fog composite of a nighttime scene on the mask grid.
///
/// Rejects daytime scenes with `OutOfWindow` and grids that differ from the
/// mask with `ShapeMismatch`. Percentile ranges are taken over the whole
/// scene, inside and outside the domain.
pub fn fog_composite(
    scene: &Scene,
    mask: &DomainMask,
    options: &RgbOptions,
) -> Result<Grid<Rgb>, SceneError> {
    BucketKey::from_timestamp(scene.timestamp)?;
    let shape = mask.shape();
    for ch in Channel::ALL {
        scene.channel(ch).ensure_shape(shape)?;
    }

    let t39 = &scene.channel(Channel::Ir3_9).data;
    let t108 = &scene.channel(Channel::Ir10_8).data;
    let t120 = &scene.channel(Channel::Ir12_0).data;
    let valid = |v: f32| (!scene.is_no_data(v)).then_some(v as f64);

    let mut red = Vec::with_capacity(shape.len());
    let mut green = Vec::with_capacity(shape.len());
    let mut blue = Vec::with_capacity(shape.len());
    for i in 0..shape.len() {
        let (a, b, c) = (valid(t39[i]), valid(t108[i]), valid(t120[i]));
        red.push(c.zip(b).map(|(c, b)| c - b));
        green.push(b.zip(a).map(|(b, a)| b - a));
        blue.push(b);
    }

    let r_range = stretch_range(&red, options.stretch, FIXED_RED);
    let g_range = stretch_range(&green, options.stretch, FIXED_GREEN);
    let b_range = stretch_range(&blue, options.stretch, FIXED_BLUE);
    log::debug!(
        "{} fog RGB ranges: red {r_range:?}, green {g_range:?}, blue {b_range:?}",
        scene.timestamp
    );

    let data = mask
        .grid()
        .data
        .iter()
        .enumerate()
        .map(|(i, &inside)| {
            if !inside {
                return OUTSIDE_DOMAIN;
            }
            match (red[i], green[i], blue[i]) {
                (Some(r), Some(g), Some(b)) => [
                    to_byte(r, r_range, options.gamma),
                    to_byte(g, g_range, options.gamma),
                    to_byte(b, b_range, options.gamma),
                ],
                _ => MISSING,
            }
        })
        .collect();

    Ok(Grid { width: shape.width, height: shape.height, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::DEFAULT_NO_DATA;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    /// (IR3.9, IR10.8, IR12.0) triples.
    fn scene(hour: u32, w: usize, h: usize, pixels: &[[f32; 3]]) -> Scene {
        let channels = Channel::ALL
            .into_iter()
            .enumerate()
            .map(|(i, ch)| (ch, Grid::from_vec(w, h, pixels.iter().map(|p| p[i]).collect()).unwrap()))
            .collect();
        let ts = Utc.with_ymd_and_hms(2024, 2, 2, hour, 12, 0).unwrap();
        Scene::new(channels, ts, DEFAULT_NO_DATA).unwrap()
    }

    fn inside(w: usize, h: usize) -> DomainMask {
        DomainMask::from_grid(Grid::filled(crate::grid::Shape::new(w, h), true))
    }

    const FIXED: RgbOptions = RgbOptions { stretch: Stretch::Fixed, gamma: None };

    #[test]
    fn fixed_stretch_maps_midpoints_and_clamps() {
        let s = scene(
            4,
            3,
            1,
            &[
                // red −2.5, green −2.5, blue 255: each halfway.
                [257.5, 255.0, 252.5],
                // red 10, green −30, blue 320: above, below, above.
                [350.0, 320.0, 330.0],
                // red −10, green 15, blue 210: exactly at the range ends.
                [195.0, 210.0, 200.0],
            ],
        );
        let rgb = fog_composite(&s, &inside(3, 1), &FIXED).unwrap();
        assert_eq!(rgb.data, vec![[127, 127, 127], [255, 0, 255], [0, 255, 0]]);
    }

    #[test]
    fn outside_mask_is_white_and_missing_is_black() {
        let s = scene(
            22,
            2,
            2,
            &[
                [257.5, 255.0, 252.5],
                [257.5, 255.0, 252.5],
                [DEFAULT_NO_DATA, 255.0, 252.5],
                [257.5, f32::NAN, 252.5],
            ],
        );
        let mask = DomainMask::from_grid(Grid::from_vec(2, 2, vec![true, false, true, true]).unwrap());
        let rgb = fog_composite(&s, &mask, &FIXED).unwrap();
        assert_eq!(rgb.data, vec![[127, 127, 127], OUTSIDE_DOMAIN, MISSING, MISSING]);
    }

    #[test]
    fn percentile_stretch_spans_scene() {
        let s = scene(2, 2, 1, &[[250.0, 250.0, 248.0], [255.0, 260.0, 262.0]]);
        let opts = RgbOptions { gamma: None, ..RgbOptions::default() };
        let rgb = fog_composite(&s, &inside(2, 1), &opts).unwrap();
        assert_eq!(rgb.data, vec![[0, 0, 0], [255, 255, 255]]);
    }

    #[test]
    fn percentile_interpolates() {
        let v: Vec<f64> = (0..=100).map(f64::from).collect();
        assert_abs_diff_eq!(percentile(&v, 1.0).unwrap(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(percentile(&v, 99.0).unwrap(), 99.0, epsilon = 1e-9);
        assert_abs_diff_eq!(percentile(&[2.0, 4.0], 50.0).unwrap(), 3.0, epsilon = 1e-12);
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn gamma_brightens_midtones_only() {
        assert_eq!(to_byte(0.5, [0.0, 1.0], Some(0.5)), 179);
        assert_eq!(to_byte(0.0, [0.0, 1.0], Some(0.5)), 0);
        assert_eq!(to_byte(1.0, [0.0, 1.0], Some(0.5)), 255);
        assert_eq!(to_byte(7.0, [3.0, 3.0], None), 0);
    }

    #[test]
    fn daytime_and_misaligned_scenes_are_rejected() {
        let day = scene(12, 1, 1, &[[257.5, 255.0, 252.5]]);
        assert_eq!(
            fog_composite(&day, &inside(1, 1), &FIXED).unwrap_err(),
            SceneError::OutOfWindow { hour: 12 }
        );
        let night = scene(3, 1, 1, &[[257.5, 255.0, 252.5]]);
        assert!(matches!(
            fog_composite(&night, &inside(2, 1), &FIXED),
            Err(SceneError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn file_name_uses_scene_hour() {
        let ts = Utc.with_ymd_and_hms(2024, 2, 2, 4, 12, 0).unwrap();
        assert_eq!(rgb_file_name(ts), "2024020204_RGB_FOG_Morocco.png");
    }
}
