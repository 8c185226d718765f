//! One geostationary observation: three co-registered infrared channels in
//! brightness temperature (K) plus the acquisition time.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SceneError};
use crate::grid::{Grid, Shape};
use crate::radiance::to_brightness_temperature;

/// Fill value written by the product tailoring service.
pub const DEFAULT_NO_DATA: f32 = -1000.0;

/// Format of the product's `date_time` attribute, e.g. `20240202/04:12`.
pub const PRODUCT_TIME_FORMAT: &str = "%Y%m%d/%H:%M";

/// Infrared channels used by the BTD test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "IR3_9")]
    Ir3_9,
    #[serde(rename = "IR10_8")]
    Ir10_8,
    #[serde(rename = "IR12_0")]
    Ir12_0,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Ir3_9, Channel::Ir10_8, Channel::Ir12_0];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Ir3_9 => "IR3_9",
            Channel::Ir10_8 => "IR10_8",
            Channel::Ir12_0 => "IR12_0",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Physical quantity carried by a decoded scene's channel grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    BrightnessTemperature,
    Radiance,
}

/// A validated scene. All three channels are present and share one shape.
#[derive(Debug, Clone)]
pub struct Scene {
    ir3_9: Grid<f32>,
    ir10_8: Grid<f32>,
    ir12_0: Grid<f32>,
    pub timestamp: DateTime<Utc>,
    pub no_data_value: f32,
}

impl Scene {
    /// Validate and assemble a scene from a channel map.
    ///
    /// Fails with `MissingChannel` if any of the three channels is absent and
    /// `ShapeMismatch` if their shapes differ or a buffer does not fill its grid.
    pub fn new(
        mut channels: BTreeMap<Channel, Grid<f32>>,
        timestamp: DateTime<Utc>,
        no_data_value: f32,
    ) -> Result<Self, SceneError> {
        let mut take = |ch: Channel| -> Result<Grid<f32>, SceneError> {
            let g = channels.remove(&ch).ok_or(SceneError::MissingChannel(ch))?;
            Grid::from_vec(g.width, g.height, g.data)
        };
        let ir3_9 = take(Channel::Ir3_9)?;
        let ir10_8 = take(Channel::Ir10_8)?;
        let ir12_0 = take(Channel::Ir12_0)?;

        let expected = ir3_9.shape();
        ir10_8.ensure_shape(expected)?;
        ir12_0.ensure_shape(expected)?;

        Ok(Self { ir3_9, ir10_8, ir12_0, timestamp, no_data_value })
    }

    /// Build a scene from a decoded record, converting radiances if needed.
    pub fn from_record(record: SceneRecord) -> Result<Self, SceneError> {
        let timestamp = parse_timestamp(&record.timestamp)?;
        let no_data = record.no_data_value;
        let channels: BTreeMap<Channel, Grid<f32>> = match record.units {
            Units::BrightnessTemperature => record.channels,
            Units::Radiance => record
                .channels
                .into_iter()
                .map(|(ch, g)| -> Result<(Channel, Grid<f32>), SceneError> {
                    let g = Grid::from_vec(g.width, g.height, g.data)?;
                    Ok((ch, to_brightness_temperature(ch, &g, no_data)))
                })
                .collect::<Result<_, SceneError>>()?,
        };
        Self::new(channels, timestamp, no_data)
    }

    pub fn channel(&self, channel: Channel) -> &Grid<f32> {
        match channel {
            Channel::Ir3_9 => &self.ir3_9,
            Channel::Ir10_8 => &self.ir10_8,
            Channel::Ir12_0 => &self.ir12_0,
        }
    }

    pub fn shape(&self) -> Shape {
        self.ir3_9.shape()
    }

    /// True if `value` is the declared sentinel or NaN.
    #[inline]
    pub fn is_no_data(&self, value: f32) -> bool {
        value.is_nan() || value == self.no_data_value
    }
}

/// JSON interchange form written by the external raster decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneRecord {
    /// RFC 3339 (`2024-02-02T04:12:00Z`) or product form (`20240202/04:12`).
    pub timestamp: String,
    #[serde(default = "default_no_data")]
    pub no_data_value: f32,
    #[serde(default)]
    pub units: Units,
    pub channels: BTreeMap<Channel, Grid<f32>>,
}

fn default_no_data() -> f32 {
    DEFAULT_NO_DATA
}

impl SceneRecord {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Parse an acquisition time given either as RFC 3339 or in the product's
/// `YYYYMMDD/HH:MM` attribute form. The latter is always UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, SceneError> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, PRODUCT_TIME_FORMAT)
        .map(|t| t.and_utc())
        .map_err(|_| SceneError::InvalidTimestamp(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    fn grid(w: usize, h: usize, v: f32) -> Grid<f32> {
        Grid::filled(Shape::new(w, h), v)
    }

    fn all_channels(w: usize, h: usize) -> BTreeMap<Channel, Grid<f32>> {
        Channel::ALL.into_iter().map(|c| (c, grid(w, h, 280.0))).collect()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 2, 0, 0).unwrap()
    }

    #[test]
    fn missing_channel_is_rejected() {
        let mut channels = all_channels(2, 2);
        channels.remove(&Channel::Ir12_0);
        let err = Scene::new(channels, t0(), DEFAULT_NO_DATA).unwrap_err();
        assert_eq!(err, SceneError::MissingChannel(Channel::Ir12_0));
    }

    #[test]
    fn mismatched_channel_shapes_are_rejected() {
        let mut channels = all_channels(2, 2);
        channels.insert(Channel::Ir10_8, grid(3, 2, 280.0));
        let err = Scene::new(channels, t0(), DEFAULT_NO_DATA).unwrap_err();
        assert!(matches!(err, SceneError::ShapeMismatch { .. }));
    }

    #[test]
    fn nan_and_sentinel_are_no_data() {
        let scene = Scene::new(all_channels(1, 1), t0(), DEFAULT_NO_DATA).unwrap();
        assert!(scene.is_no_data(f32::NAN));
        assert!(scene.is_no_data(-1000.0));
        assert!(!scene.is_no_data(280.0));
    }

    #[test]
    fn product_and_rfc3339_timestamps_parse() {
        let t = parse_timestamp("20240202/04:12").unwrap();
        assert_eq!((t.month(), t.day(), t.hour(), t.minute()), (2, 2, 4, 12));
        let t = parse_timestamp("2024-03-05T22:15:00+01:00").unwrap();
        assert_eq!((t.day(), t.hour()), (5, 21));
        assert!(matches!(parse_timestamp("yesterday"), Err(SceneError::InvalidTimestamp(_))));
    }

    #[test]
    fn record_json_round_trips_into_scene() {
        let json = r#"{
            "timestamp": "20240115/02:00",
            "channels": {
                "IR3_9":  { "width": 2, "height": 1, "data": [280.0, -1000.0] },
                "IR10_8": { "width": 2, "height": 1, "data": [285.0, 285.0] },
                "IR12_0": { "width": 2, "height": 1, "data": [285.5, 285.5] }
            }
        }"#;
        let record: SceneRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.no_data_value, DEFAULT_NO_DATA);
        assert_eq!(record.units, Units::BrightnessTemperature);
        let scene = Scene::from_record(record).unwrap();
        assert_eq!(scene.shape(), Shape::new(2, 1));
        assert_eq!(*scene.channel(Channel::Ir3_9).get(0, 1), -1000.0);
    }

    #[test]
    fn radiance_record_is_converted_to_kelvin() {
        let json = r#"{
            "timestamp": "2024-01-15T02:00:00Z",
            "units": "radiance",
            "channels": {
                "IR3_9":  { "width": 1, "height": 1, "data": [0.5] },
                "IR10_8": { "width": 1, "height": 1, "data": [100.0] },
                "IR12_0": { "width": 1, "height": 1, "data": [-1000.0] }
            }
        }"#;
        let scene = Scene::from_record(serde_json::from_str(json).unwrap()).unwrap();
        let tb = *scene.channel(Channel::Ir10_8).get(0, 0);
        assert!(tb > 280.0 && tb < 300.0, "{tb}");
        assert!(scene.is_no_data(*scene.channel(Channel::Ir12_0).get(0, 0)));
    }
}
