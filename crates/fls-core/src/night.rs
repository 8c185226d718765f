//! Nighttime window and (month, hour) bucket keys.
//!
//! The BTD test relies on the IR3.9 channel being purely emissive, so only
//! scenes acquired between 18:00 and 06:00 UTC are used. Both ends of the
//! window are included.

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SceneError;

/// Nighttime hours (UTC) in the order they occur during a night.
pub const NIGHT_HOURS: [u32; 13] = [18, 19, 20, 21, 22, 23, 0, 1, 2, 3, 4, 5, 6];

#[inline]
pub fn is_night_hour(hour: u32) -> bool {
    hour >= 18 || hour <= 6
}

/// Accumulator slot: calendar month (1-12) and nighttime hour (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub month: u32,
    pub hour: u32,
}

impl BucketKey {
    /// Validate a (month, hour) pair.
    pub fn new(month: u32, hour: u32) -> Result<Self, SceneError> {
        if !is_night_hour(hour) || hour > 23 {
            return Err(SceneError::OutOfWindow { hour });
        }
        if !(1..=12).contains(&month) {
            return Err(SceneError::InvalidTimestamp(format!("month {month}")));
        }
        Ok(Self { month, hour })
    }

    /// Bucket for a scene acquired at `t`; `OutOfWindow` for daytime scenes.
    pub fn from_timestamp(t: DateTime<Utc>) -> Result<Self, SceneError> {
        Self::new(t.month(), t.hour())
    }

    /// Zero-padded `MMhh` stem used to name per-bucket outputs, e.g. `0118`.
    pub fn file_stem(&self) -> String {
        format!("{:02}{:02}", self.month, self.hour)
    }

    /// Inverse of [`file_stem`](Self::file_stem).
    pub fn parse_stem(stem: &str) -> Option<Self> {
        if stem.len() != 4 || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let month = stem[..2].parse().ok()?;
        let hour = stem[2..].parse().ok()?;
        Self::new(month, hour).ok()
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "month {:02} hour {:02}", self.month, self.hour)
    }
}
