//! Frequency map renderer: reads the `MMhh.txt` summaries and writes PNGs.
//!
//! Outputs, per input directory:
//!   MMhh_plot.png         one map per bucket
//!   all_hh_plot.png       mean of each hour across months
//!   Month_MM_plot.png     mean of each month across hours
//!   Total_Period_plot.png mean over every bucket
//! Undefined frequency (no valid observation) is transparent.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::Logger;
use fls_core::export::{bucket_key_from_path, read_summary, SummaryGrid};
use fls_core::frequency::{Aggregate, FrequencyMap};
use fls_core::BucketKey;

#[derive(Parser, Debug)]
#[command(name = "visualize", about = "Render FLS frequency maps from MMhh.txt summaries")]
struct Args {
    /// Directory holding the MMhh.txt summaries.
    #[arg(short, long, default_value = "data/synthese")]
    input: PathBuf,

    /// Output directory for PNG maps.
    #[arg(short, long, default_value = "fig")]
    output: PathBuf,

    /// Output pixels per grid cell.
    #[arg(short, long, default_value_t = 2)]
    scale: u32,
}

// ── Colour helpers ────────────────────────────────────────────────────────────

/// Plasma colormap control points, evenly spaced over [0, 1].
const PLASMA: [[u8; 3]; 9] = [
    [13, 8, 135],
    [75, 3, 161],
    [125, 3, 168],
    [168, 34, 150],
    [203, 70, 121],
    [229, 107, 93],
    [248, 148, 65],
    [253, 195, 40],
    [240, 249, 33],
];

/// Frequency [0, 1] → plasma RGBA; undefined → fully transparent.
fn frequency_color(freq: Option<f32>) -> [u8; 4] {
    let Some(f) = freq else {
        return [0, 0, 0, 0];
    };
    let t = f.clamp(0.0, 1.0) * (PLASMA.len() - 1) as f32;
    let i = (t.floor() as usize).min(PLASMA.len() - 2);
    let w = t - i as f32;
    let (a, b) = (PLASMA[i], PLASMA[i + 1]);
    let lerp = |k: usize| (a[k] as f32 * (1.0 - w) + b[k] as f32 * w).round() as u8;
    [lerp(0), lerp(1), lerp(2), 255]
}

fn render(map: &FrequencyMap, scale: u32, path: &Path) -> Result<()> {
    let scale = scale.max(1);
    let mut img = image::RgbaImage::new(map.width as u32 * scale, map.height as u32 * scale);
    for r in 0..map.height {
        for c in 0..map.width {
            let px = image::Rgba(frequency_color(*map.get(r, c)));
            for dy in 0..scale {
                for dx in 0..scale {
                    img.put_pixel(c as u32 * scale + dx, r as u32 * scale + dy, px);
                }
            }
        }
    }
    img.save(path).with_context(|| format!("saving {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    let _logger = Logger::try_with_str("info")?.log_to_stderr().start()?;

    let mut paths: Vec<(BucketKey, PathBuf)> = fs::read_dir(&args.input)
        .with_context(|| format!("listing {}", args.input.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter_map(|p| bucket_key_from_path(&p).map(|k| (k, p)))
        .collect();
    paths.sort();

    // Means are only meaningful over grids with identical coordinates.
    let mut grids: BTreeMap<BucketKey, SummaryGrid> = BTreeMap::new();
    let mut reference: Option<(Vec<f64>, Vec<f64>)> = None;
    for (key, path) in &paths {
        let grid = read_summary(path)
            .with_context(|| format!("reading {}", path.display()))?
            .to_summary_grid();
        if grid.lats.is_empty() {
            log::warn!("{} has no rows, skipping", path.display());
            continue;
        }
        match &reference {
            Some((lats, lons)) if *lats != grid.lats || *lons != grid.lons => {
                log::warn!("{} uses a different grid, skipping", path.display());
                continue;
            }
            Some(_) => {}
            None => reference = Some((grid.lats.clone(), grid.lons.clone())),
        }
        grids.insert(*key, grid);
    }
    log::info!("{} summaries loaded from {}", grids.len(), args.input.display());

    fs::create_dir_all(&args.output)?;

    // ── 1. one map per bucket ────────────────────────────────────────────────
    for (key, grid) in &grids {
        let path = args.output.join(format!("{}_plot.png", key.file_stem()));
        render(&grid.frequency, args.scale, &path)?;
    }

    // ── 2. hourly, monthly and full-period means ─────────────────────────────
    for aggregate in Aggregate::all() {
        let maps = grids.iter().map(|(k, g)| (k, &g.frequency));
        if let Some(mean) = aggregate.mean(maps)? {
            render(&mean, args.scale, &args.output.join(format!("{aggregate}_plot.png")))?;
        }
    }

    println!("Done.");
    Ok(())
}
