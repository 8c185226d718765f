//! Temporal accumulator: per-(month, hour) FLS and valid-observation counts.
//!
//! Counts only ever grow, and each ingest is a per-pixel addition, so the
//! final state does not depend on the order scenes arrive in. Ingesting the
//! same scene twice counts it twice; deduplication belongs to the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::classify::{Category, ClassificationGrid};
use crate::error::SceneError;
use crate::frequency::{ratio, Aggregate, FrequencyMap};
use crate::grid::{Grid, Shape};
use crate::night::BucketKey;

/// Running counts for one (month, hour) slot.
///
/// Invariant: `fls_count[p] <= valid_count[p] <= scenes` for every pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorBucket {
    pub fls_count: Grid<u32>,
    pub valid_count: Grid<u32>,
    /// Number of scenes folded into this bucket.
    pub scenes: u32,
}

impl AccumulatorBucket {
    fn new(shape: Shape) -> Self {
        Self {
            fls_count: Grid::filled(shape, 0),
            valid_count: Grid::filled(shape, 0),
            scenes: 0,
        }
    }

    fn add(&mut self, classification: &Grid<Category>) {
        let cells = self
            .fls_count
            .data
            .iter_mut()
            .zip(self.valid_count.data.iter_mut())
            .zip(classification.data.iter());
        for ((fls, valid), category) in cells {
            match category {
                Category::Fls => {
                    *fls = fls.saturating_add(1);
                    *valid = valid.saturating_add(1);
                }
                Category::Clear => *valid = valid.saturating_add(1),
                Category::NoData => {}
            }
        }
        self.scenes = self.scenes.saturating_add(1);
    }

    fn merge(&mut self, other: &AccumulatorBucket) {
        for (a, b) in self.fls_count.data.iter_mut().zip(&other.fls_count.data) {
            *a = a.saturating_add(*b);
        }
        for (a, b) in self.valid_count.data.iter_mut().zip(&other.valid_count.data) {
            *a = a.saturating_add(*b);
        }
        self.scenes = self.scenes.saturating_add(other.scenes);
    }

    /// Per-pixel FLS frequency; undefined where `valid_count == 0`.
    pub fn frequency(&self) -> FrequencyMap {
        let data = self
            .fls_count
            .data
            .iter()
            .zip(&self.valid_count.data)
            .map(|(&f, &v)| ratio(f, v))
            .collect();
        Grid {
            width: self.fls_count.width,
            height: self.fls_count.height,
            data,
        }
    }
}

/// Owns every bucket of a run. Buckets are created on first use.
#[derive(Debug, Clone)]
pub struct TemporalAccumulator {
    shape: Shape,
    buckets: BTreeMap<BucketKey, AccumulatorBucket>,
}

impl TemporalAccumulator {
    pub fn new(shape: Shape) -> Self {
        Self { shape, buckets: BTreeMap::new() }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Fold one classified scene into the bucket for `scene_timestamp`.
    ///
    /// On error (`OutOfWindow`, `ShapeMismatch`) no bucket is touched.
    pub fn ingest(
        &mut self,
        scene_timestamp: DateTime<Utc>,
        classification: &ClassificationGrid,
    ) -> Result<BucketKey, SceneError> {
        let key = BucketKey::from_timestamp(scene_timestamp)?;
        classification.grid.ensure_shape(self.shape)?;

        let shape = self.shape;
        self.buckets
            .entry(key)
            .or_insert_with(|| AccumulatorBucket::new(shape))
            .add(&classification.grid);
        Ok(key)
    }

    /// Current counts for (month, hour), if any scene has landed there.
    pub fn snapshot(&self, month: u32, hour: u32) -> Option<&AccumulatorBucket> {
        self.buckets.get(&BucketKey { month, hour })
    }

    /// Buckets in increasing (month, hour) order.
    pub fn buckets(&self) -> impl Iterator<Item = (&BucketKey, &AccumulatorBucket)> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Add all counts of `other` into `self`.
    pub fn merge(&mut self, other: &TemporalAccumulator) -> Result<(), SceneError> {
        if other.shape != self.shape {
            return Err(SceneError::ShapeMismatch { expected: self.shape, found: other.shape });
        }
        let shape = self.shape;
        for (key, bucket) in &other.buckets {
            self.buckets
                .entry(*key)
                .or_insert_with(|| AccumulatorBucket::new(shape))
                .merge(bucket);
        }
        Ok(())
    }

    /// End the run: buckets become read-only.
    pub fn finalize(self) -> Climatology {
        Climatology { shape: self.shape, buckets: self.buckets }
    }
}

/// Finalized, read-only result of a complete run.
#[derive(Debug, Clone)]
pub struct Climatology {
    shape: Shape,
    buckets: BTreeMap<BucketKey, AccumulatorBucket>,
}

impl Climatology {
    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn snapshot(&self, month: u32, hour: u32) -> Option<&AccumulatorBucket> {
        self.buckets.get(&BucketKey { month, hour })
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&BucketKey, &AccumulatorBucket)> {
        self.buckets.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &BucketKey> {
        self.buckets.keys()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Mean frequency map of an aggregate, or `None` if no bucket falls in it.
    ///
    /// For library callers holding a finished run. Tools that only have the
    /// `MMhh.txt` summaries call [`Aggregate::mean`] on the parsed maps.
    pub fn mean(&self, aggregate: Aggregate) -> Option<FrequencyMap> {
        let maps: Vec<(&BucketKey, FrequencyMap)> =
            self.buckets.iter().map(|(k, b)| (k, b.frequency())).collect();
        // All buckets share `self.shape`, so the mean cannot fail.
        aggregate.mean(maps.iter().map(|(k, m)| (*k, m))).ok().flatten()
    }

    /// Mean frequency of `hour` across all months that have it.
    pub fn hourly_mean(&self, hour: u32) -> Option<FrequencyMap> {
        self.mean(Aggregate::Hour(hour))
    }

    /// Mean frequency of `month` across all its nighttime hours.
    pub fn monthly_mean(&self, month: u32) -> Option<FrequencyMap> {
        self.mean(Aggregate::Month(month))
    }

    /// Mean frequency over every bucket of the run.
    pub fn period_mean(&self) -> Option<FrequencyMap> {
        self.mean(Aggregate::Period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    use Category::{Clear, Fls, NoData};

    fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, hour, 0, 0).unwrap()
    }

    fn cg(w: usize, h: usize, cats: Vec<Category>) -> ClassificationGrid {
        ClassificationGrid { grid: Grid::from_vec(w, h, cats).unwrap() }
    }

    fn check_bounds(acc: &TemporalAccumulator) {
        for (_, b) in acc.buckets() {
            for (f, v) in b.fls_count.data.iter().zip(&b.valid_count.data) {
                assert!(f <= v, "fls {f} > valid {v}");
                assert!(*v <= b.scenes, "valid {v} > scenes {}", b.scenes);
            }
        }
    }

    #[test]
    fn fls_clear_and_no_data_increment_as_specified() {
        let mut acc = TemporalAccumulator::new(Shape::new(3, 1));
        let key = acc.ingest(at(1, 5, 2), &cg(3, 1, vec![Fls, Clear, NoData])).unwrap();
        assert_eq!(key, BucketKey { month: 1, hour: 2 });

        let b = acc.snapshot(1, 2).unwrap();
        assert_eq!(b.fls_count.data, vec![1, 0, 0]);
        assert_eq!(b.valid_count.data, vec![1, 1, 0]);
        assert_eq!(b.scenes, 1);
        assert!(acc.snapshot(1, 3).is_none());
    }

    #[test]
    fn out_of_window_leaves_state_unchanged() {
        let mut acc = TemporalAccumulator::new(Shape::new(1, 1));
        acc.ingest(at(1, 5, 2), &cg(1, 1, vec![Fls])).unwrap();
        let before = acc.snapshot(1, 2).cloned();

        let err = acc.ingest(at(1, 5, 12), &cg(1, 1, vec![Fls])).unwrap_err();
        assert_eq!(err, SceneError::OutOfWindow { hour: 12 });
        assert_eq!(acc.len(), 1);
        assert_eq!(acc.snapshot(1, 2).cloned(), before);
        assert!(acc.snapshot(1, 12).is_none());
    }

    #[test]
    fn wrong_shape_is_rejected_before_mutation() {
        let mut acc = TemporalAccumulator::new(Shape::new(2, 1));
        let err = acc.ingest(at(2, 1, 20), &cg(1, 2, vec![Fls, Fls])).unwrap_err();
        assert!(matches!(err, SceneError::ShapeMismatch { .. }));
        assert!(acc.is_empty());
    }

    #[test]
    fn accumulation_is_order_independent() {
        let scenes: Vec<(DateTime<Utc>, ClassificationGrid)> = vec![
            (at(1, 1, 2), cg(2, 2, vec![Fls, Clear, NoData, Fls])),
            (at(1, 2, 2), cg(2, 2, vec![Clear, Clear, Fls, NoData])),
            (at(1, 3, 2), cg(2, 2, vec![Fls, NoData, Clear, Fls])),
            (at(3, 1, 23), cg(2, 2, vec![NoData, Fls, Fls, Clear])),
            (at(3, 9, 23), cg(2, 2, vec![Clear, Fls, NoData, NoData])),
        ];

        let run = |order: &[usize]| {
            let mut acc = TemporalAccumulator::new(Shape::new(2, 2));
            for &i in order {
                acc.ingest(scenes[i].0, &scenes[i].1).unwrap();
            }
            check_bounds(&acc);
            acc.finalize()
        };

        let reference = run(&[0, 1, 2, 3, 4]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut order: Vec<usize> = (0..scenes.len()).collect();
        for _ in 0..20 {
            order.shuffle(&mut rng);
            let other = run(&order);
            let a: Vec<_> = reference.buckets().collect();
            let b: Vec<_> = other.buckets().collect();
            assert_eq!(a, b, "order {order:?}");
        }
    }

    #[test]
    fn merge_equals_sequential_ingest() {
        let a_scenes = [(at(1, 1, 2), vec![Fls, Clear]), (at(1, 2, 18), vec![Clear, NoData])];
        let b_scenes = [(at(1, 3, 2), vec![Fls, Fls]), (at(2, 1, 6), vec![NoData, Clear])];

        let mut all = TemporalAccumulator::new(Shape::new(2, 1));
        let mut a = TemporalAccumulator::new(Shape::new(2, 1));
        let mut b = TemporalAccumulator::new(Shape::new(2, 1));
        for (t, c) in &a_scenes {
            all.ingest(*t, &cg(2, 1, c.clone())).unwrap();
            a.ingest(*t, &cg(2, 1, c.clone())).unwrap();
        }
        for (t, c) in &b_scenes {
            all.ingest(*t, &cg(2, 1, c.clone())).unwrap();
            b.ingest(*t, &cg(2, 1, c.clone())).unwrap();
        }
        a.merge(&b).unwrap();

        let lhs: Vec<_> = a.buckets().collect();
        let rhs: Vec<_> = all.buckets().collect();
        assert_eq!(lhs, rhs);
        assert!(a.merge(&TemporalAccumulator::new(Shape::new(1, 1))).is_err());
    }

    #[test]
    fn duplicate_ingest_double_counts() {
        let mut acc = TemporalAccumulator::new(Shape::new(1, 1));
        let c = cg(1, 1, vec![Fls]);
        acc.ingest(at(4, 1, 0), &c).unwrap();
        acc.ingest(at(4, 1, 0), &c).unwrap();
        let b = acc.snapshot(4, 0).unwrap();
        assert_eq!((b.fls_count.data[0], b.valid_count.data[0], b.scenes), (2, 2, 2));
    }

    #[test]
    fn frequency_flags_unobserved_pixels() {
        let mut acc = TemporalAccumulator::new(Shape::new(3, 1));
        acc.ingest(at(1, 1, 2), &cg(3, 1, vec![Fls, Clear, NoData])).unwrap();
        acc.ingest(at(1, 2, 2), &cg(3, 1, vec![Clear, Clear, NoData])).unwrap();
        let freq = acc.snapshot(1, 2).unwrap().frequency();
        assert_eq!(freq.data, vec![Some(0.5), Some(0.0), None]);
    }

    #[test]
    fn climatology_means_group_by_hour_and_month() {
        let mut acc = TemporalAccumulator::new(Shape::new(1, 1));
        acc.ingest(at(1, 1, 2), &cg(1, 1, vec![Fls])).unwrap(); // 0102: 1.0
        acc.ingest(at(2, 1, 2), &cg(1, 1, vec![Clear])).unwrap(); // 0202: 0.0
        acc.ingest(at(2, 1, 20), &cg(1, 1, vec![NoData])).unwrap(); // 0220: undefined
        let clim = acc.finalize();

        assert_eq!(clim.keys().copied().collect::<Vec<_>>(), vec![
            BucketKey { month: 1, hour: 2 },
            BucketKey { month: 2, hour: 2 },
            BucketKey { month: 2, hour: 20 },
        ]);
        assert_eq!(clim.hourly_mean(2).unwrap().data, vec![Some(0.5)]);
        assert_eq!(clim.monthly_mean(2).unwrap().data, vec![Some(0.0)]);
        assert_eq!(clim.hourly_mean(20).unwrap().data, vec![None]);
        assert_eq!(clim.period_mean().unwrap().data, vec![Some(0.5)]);
        assert!(clim.hourly_mean(4).is_none());
    }
}
