//! Nighttime FLS climatology runner.
//! Reads decoded scene records, classifies each one against the domain mask,
//! accumulates per (month, hour) and writes one `MMhh.txt` summary per bucket.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use flexi_logger::Logger;
use fls_core::{
    export::SummaryWriter, ClimatologyRun, DomainMask, RegionBoundary, RunConfig, SceneRecord,
};

/// Scenes held in memory at once when classifying in parallel.
const BATCH_SIZE: usize = 32;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "climatology", about = "Build the nighttime FLS climatology from decoded scenes")]
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

    /// Output directory for MMhh.txt summaries. Overrides the config.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log spec, e.g. "debug" or "fls_core=debug". Overrides the config.
    #[arg(long)]
    log_level: Option<String>,

    /// Write the default configuration to this path and exit.
    #[arg(long)]
    write_default_config: Option<PathBuf>,
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
        cfg.output_dir = dir.clone();
    }
    if let Some(level) = &args.log_level {
        cfg.log_level = level.clone();
    }
    Ok(cfg)
}

/// Scene record files in `dir`, sorted by name.
fn discover_scenes(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.write_default_config {
        fs::write(path, serde_json::to_string_pretty(&RunConfig::default())?)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let cfg = load_config(&args)?;
    let _logger = Logger::try_with_str(&cfg.log_level)?.log_to_stderr().start()?;

    // Setup errors are fatal: nothing is processed without a valid mask.
    let geometry = cfg.grid.geometry().context("grid geometry")?;
    let boundary = RegionBoundary::load(&cfg.boundary)
        .with_context(|| format!("reading boundary {}", cfg.boundary.display()))?;
    let mask = DomainMask::build(&boundary, &geometry).context("building domain mask")?;
    let writer = SummaryWriter::new(&geometry, &mask)?;

    let files = discover_scenes(&cfg.scenes_dir)?;
    if files.is_empty() {
        bail!("no scene records in {}", cfg.scenes_dir.display());
    }
    log::info!("processing {} scene records from {}", files.len(), cfg.scenes_dir.display());

    let mut run = ClimatologyRun::new(&mask, cfg.thresholds);
    let mut unreadable = 0usize;
    for chunk in files.chunks(BATCH_SIZE) {
        let mut scenes = Vec::with_capacity(chunk.len());
        for path in chunk {
            let source = path.display().to_string();
            let record = match SceneRecord::load(path) {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("cannot read {source}: {e}");
                    unreadable += 1;
                    continue;
                }
            };
            scenes.extend(run.validate_record(&source, record));
        }
        run.process_batch(&scenes);
    }

    let (climatology, report) = run.finish();
    if unreadable > 0 {
        log::warn!("{unreadable} files could not be read");
    }
    if report.total_skipped() > 0 {
        log::warn!("{report}");
    }
    if climatology.is_empty() {
        bail!("no scene fell in the nighttime window; nothing to write");
    }

    let written = writer.write_climatology(&cfg.output_dir, &climatology)?;
    println!(
        "{}. {} summaries in {}.",
        report,
        written.len(),
        cfg.output_dir.display()
    );
    Ok(())
}
