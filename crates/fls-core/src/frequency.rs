//! Per-pixel FLS frequency maps and their averages.

use std::fmt;

use crate::error::SceneError;
use crate::grid::{Grid, Shape};
use crate::night::{BucketKey, NIGHT_HOURS};

/// `fls_count / valid_count` per pixel; `None` where nothing valid was observed.
pub type FrequencyMap = Grid<Option<f32>>;

/// Frequency for one pixel. Never reports 0 for an unobserved pixel.
#[inline]
pub fn ratio(fls: u32, valid: u32) -> Option<f32> {
    (valid > 0).then(|| fls as f32 / valid as f32)
}

/// Per-pixel mean of several maps, skipping undefined entries.
///
/// A pixel is undefined in the result only if it is undefined in every input.
/// Returns `Ok(None)` for an empty slice.
pub fn nan_mean(maps: &[&FrequencyMap]) -> Result<Option<FrequencyMap>, SceneError> {
    let Some(first) = maps.first() else {
        return Ok(None);
    };
    let shape: Shape = first.shape();
    for m in maps {
        m.ensure_shape(shape)?;
    }

    let data = (0..shape.len())
        .map(|i| {
            let (sum, n) = maps
                .iter()
                .filter_map(|m| m.data[i])
                .fold((0.0f64, 0u32), |(s, n), v| (s + v as f64, n + 1));
            (n > 0).then(|| (sum / n as f64) as f32)
        })
        .collect();
    Ok(Some(Grid { width: shape.width, height: shape.height, data }))
}

/// A group of buckets averaged into one map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// One nighttime hour across all months.
    Hour(u32),
    /// One month across all its nighttime hours.
    Month(u32),
    /// Every bucket.
    Period,
}

impl Aggregate {
    /// Hourly aggregates in night order, then months, then the full period.
    pub fn all() -> Vec<Aggregate> {
        NIGHT_HOURS
            .into_iter()
            .map(Aggregate::Hour)
            .chain((1..=12).map(Aggregate::Month))
            .chain(std::iter::once(Aggregate::Period))
            .collect()
    }

    pub fn includes(&self, key: &BucketKey) -> bool {
        match *self {
            Aggregate::Hour(h) => key.hour == h,
            Aggregate::Month(m) => key.month == m,
            Aggregate::Period => true,
        }
    }

    /// Mean of the maps whose bucket falls in this aggregate; `Ok(None)` if
    /// none does.
    pub fn mean<'a>(
        &self,
        maps: impl IntoIterator<Item = (&'a BucketKey, &'a FrequencyMap)>,
    ) -> Result<Option<FrequencyMap>, SceneError> {
        let selected: Vec<&FrequencyMap> = maps
            .into_iter()
            .filter(|(k, _)| self.includes(k))
            .map(|(_, m)| m)
            .collect();
        nan_mean(&selected)
    }
}

/// `all_hh`, `Month_MM` or `Total_Period`.
impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Hour(h) => write!(f, "all_{h:02}"),
            Aggregate::Month(m) => write!(f, "Month_{m:02}"),
            Aggregate::Period => f.write_str("Total_Period"),
        }
    }
}
