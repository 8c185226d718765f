//! One climatology run: mask → classify → accumulate, scene by scene.
//!
//! Per-scene failures are logged, counted and skipped; the run carries on.
//! A run that is abandoned before `finish` leaves no `Climatology` behind,
//! so partial buckets can never be mistaken for a complete result.

use std::collections::BTreeMap;
use std::fmt;

use crate::accumulator::{Climatology, TemporalAccumulator};
use crate::classify::{classify_scene, BtdThresholds, ClassificationGrid};
use crate::error::{SceneError, SkipKind};
use crate::mask::DomainMask;
use crate::night::BucketKey;
use crate::scene::{Scene, SceneRecord};

/// Scenes skipped during a run, by failure kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipReport {
    pub ingested: usize,
    skipped: BTreeMap<SkipKind, usize>,
}

impl SkipReport {
    pub fn record(&mut self, kind: SkipKind) {
        *self.skipped.entry(kind).or_default() += 1;
    }

    pub fn count(&self, kind: SkipKind) -> usize {
        self.skipped.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }
}

impl fmt::Display for SkipReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} scenes ingested, {} skipped", self.ingested, self.total_skipped())?;
        for (kind, n) in &self.skipped {
            write!(f, ", {kind:?}: {n}")?;
        }
        Ok(())
    }
}

pub struct ClimatologyRun<'m> {
    mask: &'m DomainMask,
    thresholds: BtdThresholds,
    accumulator: TemporalAccumulator,
    skips: SkipReport,
}

impl<'m> ClimatologyRun<'m> {
    pub fn new(mask: &'m DomainMask, thresholds: BtdThresholds) -> Self {
        Self {
            mask,
            thresholds,
            accumulator: TemporalAccumulator::new(mask.shape()),
            skips: SkipReport::default(),
        }
    }

    /// Classify and ingest one scene.
    pub fn process(&mut self, scene: &Scene) -> Result<BucketKey, SceneError> {
        let result = classify_scene(scene, self.mask, &self.thresholds);
        self.ingest(scene, result)
    }

    /// Validate a decoded record into a scene for `process` or
    /// `process_batch`. A record that fails validation is counted as skipped
    /// and `None` is returned. `source` names the record in log messages.
    pub fn validate_record(&mut self, source: &str, record: SceneRecord) -> Option<Scene> {
        match Scene::from_record(record) {
            Ok(scene) => Some(scene),
            Err(err) => {
                self.record_skip(source, &err);
                None
            }
        }
    }

    /// Process a batch. Classification runs in parallel with the `threading`
    /// feature; ingestion is always sequential. Returns the number ingested.
    pub fn process_batch(&mut self, scenes: &[Scene]) -> usize {
        let mask = self.mask;
        let thresholds = self.thresholds;

        #[cfg(feature = "threading")]
        let classified: Vec<Result<ClassificationGrid, SceneError>> = {
            use rayon::prelude::*;
            scenes.par_iter().map(|s| classify_scene(s, mask, &thresholds)).collect()
        };
        #[cfg(not(feature = "threading"))]
        let classified: Vec<Result<ClassificationGrid, SceneError>> =
            scenes.iter().map(|s| classify_scene(s, mask, &thresholds)).collect();

        let mut ingested = 0;
        for (scene, result) in scenes.iter().zip(classified) {
            if self.ingest(scene, result).is_ok() {
                ingested += 1;
            }
        }
        ingested
    }

    fn ingest(
        &mut self,
        scene: &Scene,
        classified: Result<ClassificationGrid, SceneError>,
    ) -> Result<BucketKey, SceneError> {
        let outcome = classified.and_then(|grid| {
            let key = self.accumulator.ingest(scene.timestamp, &grid)?;
            let counts = grid.counts();
            log::debug!(
                "{} -> {key}: {} FLS, {} clear, {} no-data",
                scene.timestamp,
                counts.fls,
                counts.clear,
                counts.no_data
            );
            Ok(key)
        });
        match &outcome {
            Ok(_) => self.skips.ingested += 1,
            Err(err) => self.record_skip(&scene.timestamp.to_rfc3339(), err),
        }
        outcome
    }

    fn record_skip(&mut self, source: &str, err: &SceneError) {
        log::warn!("skipping scene {source}: {err}");
        self.skips.record(err.kind());
    }

    pub fn accumulator(&self) -> &TemporalAccumulator {
        &self.accumulator
    }

    pub fn skips(&self) -> &SkipReport {
        &self.skips
    }

    /// Complete the run, freezing the buckets.
    pub fn finish(self) -> (Climatology, SkipReport) {
        log::info!("run complete: {} ({} buckets)", self.skips, self.accumulator.len());
        (self.accumulator.finalize(), self.skips)
    }
}
