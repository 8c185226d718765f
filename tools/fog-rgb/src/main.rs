//! Per-scene nighttime fog RGB images for visual inspection.
//! Writes `YYYYMMDDhh_RGB_FOG_Morocco.png` for every nighttime scene record;
//! daytime scenes are skipped.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::Logger;
use fls_core::{
    grid::Grid,
    rgb::{fog_composite, rgb_file_name, Rgb, Stretch},
    DomainMask, RegionBoundary, RunConfig, Scene, SceneError, SceneRecord,
};

#[derive(Parser, Debug)]
#[command(name = "fog-rgb", about = "Render nighttime fog RGB composites of single scenes")]
struct Args {
    /// Run configuration JSON. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of decoded scene records (*.json). Overrides the config.
    #[arg(short, long)]
    scenes_dir: Option<PathBuf>,

    /// Region boundary JSON. Overrides the config.
    #[arg(short, long)]
    boundary: Option<PathBuf>,

    /// Output directory for the PNGs. Overrides the config.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use the fixed stretch ranges instead of per-scene percentiles.
    #[arg(long)]
    fixed: bool,

    /// Gamma exponent. Overrides the config.
    #[arg(long, conflicts_with = "no_gamma")]
    gamma: Option<f64>,

    /// Disable gamma correction.
    #[arg(long)]
    no_gamma: bool,
}

fn load_config(args: &Args) -> Result<RunConfig> {
    let mut cfg = match &args.config {
        Some(path) => RunConfig::load(path).with_context(|| format!("reading config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(dir) = &args.scenes_dir {
        cfg.scenes_dir = dir.clone();
    }
    if let Some(path) = &args.boundary {
        cfg.boundary = path.clone();
    }
    if let Some(dir) = &args.output {
        cfg.images_dir = dir.clone();
    }
    if args.fixed {
        cfg.rgb.stretch = Stretch::Fixed;
    }
    if args.gamma.is_some() {
        cfg.rgb.gamma = args.gamma;
    }
    if args.no_gamma {
        cfg.rgb.gamma = None;
    }
    Ok(cfg)
}

fn save(rgb: &Grid<Rgb>, path: &Path) -> Result<()> {
    let mut img = image::RgbImage::new(rgb.width as u32, rgb.height as u32);
    for r in 0..rgb.height {
        for c in 0..rgb.width {
            img.put_pixel(c as u32, r as u32, image::Rgb(*rgb.get(r, c)));
        }
    }
    img.save(path).with_context(|| format!("saving {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = load_config(&args)?;
    let _logger = Logger::try_with_str(&cfg.log_level)?.log_to_stderr().start()?;

    let geometry = cfg.grid.geometry().context("grid geometry")?;
    let boundary = RegionBoundary::load(&cfg.boundary)
        .with_context(|| format!("reading boundary {}", cfg.boundary.display()))?;
    let mask = DomainMask::build(&boundary, &geometry).context("building domain mask")?;

    let mut files: Vec<PathBuf> = fs::read_dir(&cfg.scenes_dir)
        .with_context(|| format!("listing {}", cfg.scenes_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    fs::create_dir_all(&cfg.images_dir)?;

    let (mut written, mut daytime, mut failed) = (0usize, 0usize, 0usize);
    for path in &files {
        let result = SceneRecord::load(path)
            .map_err(anyhow::Error::from)
            .and_then(|record| Ok(Scene::from_record(record)?))
            .and_then(|scene| match fog_composite(&scene, &mask, &cfg.rgb) {
                Ok(rgb) => save(&rgb, &cfg.images_dir.join(rgb_file_name(scene.timestamp))).map(Some),
                Err(SceneError::OutOfWindow { hour }) => {
                    log::info!("{} is outside the night window ({hour:02} UTC), skipping", path.display());
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            });
        match result {
            Ok(Some(())) => written += 1,
            Ok(None) => daytime += 1,
            Err(e) => {
                log::warn!("{}: {e:#}", path.display());
                failed += 1;
            }
        }
    }

    println!("{written} images written, {daytime} daytime scenes skipped, {failed} failed.");
    Ok(())
}
