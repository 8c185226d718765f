//! Per-bucket text summaries (`MMhh.txt`) and reading them back.
//!
//! One tab-separated row per in-domain pixel, row-major (north to south,
//! west to east). Pixels never validly observed carry `NaN` frequency.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::accumulator::{AccumulatorBucket, Climatology};
use crate::error::ExportError;
use crate::frequency::{ratio, FrequencyMap};
use crate::geometry::GridGeometry;
use crate::grid::Grid;
use crate::mask::DomainMask;
use crate::night::BucketKey;

pub const SUMMARY_HEADER: [&str; 5] = ["Latitude", "Longitude", "Frequency", "FLS_Count", "Total_Obs"];

/// File name for a bucket's summary, e.g. `0118.txt`.
pub fn summary_file_name(key: &BucketKey) -> String {
    format!("{}.txt", key.file_stem())
}

/// Recover the bucket from a summary path; `None` for foreign files.
pub fn bucket_key_from_path(path: &Path) -> Option<BucketKey> {
    if path.extension()?.to_str()? != "txt" {
        return None;
    }
    BucketKey::parse_stem(path.file_stem()?.to_str()?)
}

/// Writes bucket summaries restricted to the domain mask.
pub struct SummaryWriter<'a> {
    geometry: &'a GridGeometry,
    mask: &'a DomainMask,
}

impl<'a> SummaryWriter<'a> {
    pub fn new(geometry: &'a GridGeometry, mask: &'a DomainMask) -> Result<Self, ExportError> {
        if geometry.shape() != mask.shape() {
            return Err(ExportError::ShapeMismatch { mask: mask.shape(), geometry: geometry.shape() });
        }
        Ok(Self { geometry, mask })
    }

    /// Write the summary text for one bucket to `out`.
    pub fn write_to<W: Write>(&self, bucket: &AccumulatorBucket, out: &mut W) -> Result<(), ExportError> {
        if bucket.fls_count.shape() != self.mask.shape() {
            return Err(ExportError::ShapeMismatch {
                mask: self.mask.shape(),
                geometry: bucket.fls_count.shape(),
            });
        }
        writeln!(out, "{}", SUMMARY_HEADER.join("\t"))?;
        let shape = self.mask.shape();
        for r in 0..shape.height {
            for c in 0..shape.width {
                if !self.mask.contains(r, c) {
                    continue;
                }
                let (lon, lat) = self.geometry.cell_center(r, c);
                let fls = *bucket.fls_count.get(r, c);
                let valid = *bucket.valid_count.get(r, c);
                let freq = match ratio(fls, valid) {
                    Some(f) => format!("{f:.6}"),
                    None => "NaN".to_string(),
                };
                writeln!(out, "{lat:.6}\t{lon:.6}\t{freq}\t{fls}\t{valid}")?;
            }
        }
        Ok(())
    }

    pub fn write_bucket(&self, dir: &Path, key: &BucketKey, bucket: &AccumulatorBucket) -> Result<PathBuf, ExportError> {
        let path = dir.join(summary_file_name(key));
        let mut out = BufWriter::new(File::create(&path)?);
        self.write_to(bucket, &mut out)?;
        out.flush()?;
        Ok(path)
    }

    /// Write every bucket in (month, hour) order. Creates `dir` if needed.
    pub fn write_climatology(&self, dir: &Path, climatology: &Climatology) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(dir)?;
        climatology
            .buckets()
            .map(|(key, bucket)| -> Result<PathBuf, ExportError> {
                let path = self.write_bucket(dir, key, bucket)?;
                log::info!("{key}: {} scenes -> {}", bucket.scenes, path.display());
                Ok(path)
            })
            .collect()
    }
}

/// One parsed summary line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryRow {
    pub lat: f64,
    pub lon: f64,
    pub frequency: Option<f32>,
    pub fls_count: u32,
    pub total_obs: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
}

/// Frequency grid rebuilt from a summary's coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryGrid {
    /// North first.
    pub lats: Vec<f64>,
    /// West first.
    pub lons: Vec<f64>,
    pub frequency: FrequencyMap,
}

impl SummaryTable {
    pub fn parse(text: &str) -> Result<Self, ExportError> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
        match lines.next() {
            Some((_, header)) if header.split('\t').map(str::trim).eq(SUMMARY_HEADER) => {}
            Some((i, _)) => {
                return Err(ExportError::Parse { line: i + 1, reason: "unexpected header".into() })
            }
            None => return Ok(Self { rows: Vec::new() }),
        }

        let rows = lines
            .map(|(i, line)| parse_row(line).map_err(|reason| ExportError::Parse { line: i + 1, reason }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    /// Place rows on the grid spanned by their unique coordinates.
    pub fn to_summary_grid(&self) -> SummaryGrid {
        let mut lats: Vec<f64> = self.rows.iter().map(|r| r.lat).collect();
        let mut lons: Vec<f64> = self.rows.iter().map(|r| r.lon).collect();
        lats.sort_by(|a, b| b.total_cmp(a));
        lats.dedup();
        lons.sort_by(|a, b| a.total_cmp(b));
        lons.dedup();

        let mut frequency = Grid {
            width: lons.len(),
            height: lats.len(),
            data: vec![None; lats.len() * lons.len()],
        };
        for row in &self.rows {
            let r = lats.partition_point(|&v| v > row.lat);
            let c = lons.partition_point(|&v| v < row.lon);
            frequency.set(r, c, row.frequency);
        }
        SummaryGrid { lats, lons, frequency }
    }
}

fn parse_row(line: &str) -> Result<SummaryRow, String> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() != SUMMARY_HEADER.len() {
        return Err(format!("expected {} fields, found {}", SUMMARY_HEADER.len(), fields.len()));
    }
    let num = |i: usize| -> Result<f64, String> {
        fields[i].parse::<f64>().map_err(|e| format!("{}: {e}", SUMMARY_HEADER[i]))
    };
    let count = |i: usize| -> Result<u32, String> {
        fields[i].parse::<u32>().map_err(|e| format!("{}: {e}", SUMMARY_HEADER[i]))
    };
    let freq = num(2)?;
    Ok(SummaryRow {
        lat: num(0)?,
        lon: num(1)?,
        frequency: (!freq.is_nan()).then_some(freq as f32),
        fls_count: count(3)?,
        total_obs: count(4)?,
    })
}

pub fn read_summary(path: &Path) -> Result<SummaryTable, ExportError> {
    let text = fs::read_to_string(path)?;
    SummaryTable::parse(&text)
}
