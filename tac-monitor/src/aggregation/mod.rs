//! The concurrency-safe keyed collection of statistical bin-sets.
//!
//! Writers are serialised per key only: the outer map is behind a `RwLock`
//! taken briefly for lookup or creation, and each bin-set carries its own
//! `Mutex`. Fills to different keys proceed concurrently, export locks one
//! bin-set at a time, and creation races on a never-yet-seen key resolve to
//! exactly one winning definition.

pub mod histogram;
pub mod metric;

pub use histogram::{Axis, Histogram1D, Histogram2D};
pub use metric::{BinKey, Metric};

use crate::error::MonitorError;
use serde::Serialize;
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Arc, Mutex, PoisonError, RwLock},
};
use tac_monitor_common::{Category, Real};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub enum BinSet {
    OneDim(Histogram1D),
    TwoDim(Histogram2D),
}

#[derive(Debug, Default)]
pub struct AggregationStore {
    bins: RwLock<HashMap<BinKey, Arc<Mutex<BinSet>>>>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a 1-D bin-set under `(metric, category)`. Idempotent: if the
    /// key already exists the first definition wins and existing counts are
    /// kept, even when the requested binning differs.
    pub fn ensure_1d(&self, metric: Metric, category: Category, axis: Axis) {
        self.ensure(
            BinKey { metric, category },
            BinSet::OneDim(Histogram1D::new(axis)),
        );
    }

    pub fn ensure_2d(&self, metric: Metric, category: Category, x: Axis, y: Axis) {
        self.ensure(
            BinKey { metric, category },
            BinSet::TwoDim(Histogram2D::new(x, y)),
        );
    }

    fn ensure(&self, key: BinKey, bin_set: BinSet) {
        let mut bins = self.bins.write().unwrap_or_else(PoisonError::into_inner);
        match bins.entry(key) {
            Entry::Occupied(_) => debug!("bin-set {key} already registered, keeping first definition"),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(bin_set)));
            }
        }
    }

    fn bin_set(&self, key: &BinKey) -> Result<Arc<Mutex<BinSet>>, MonitorError> {
        self.bins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or(MonitorError::UnknownKey(*key))
    }

    fn with_1d<R>(
        &self,
        metric: Metric,
        category: Category,
        f: impl FnOnce(&mut Histogram1D) -> Result<R, MonitorError>,
    ) -> Result<R, MonitorError> {
        let key = BinKey { metric, category };
        let slot = self.bin_set(&key)?;
        let mut bin_set = slot.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *bin_set {
            BinSet::OneDim(hist) => f(hist),
            BinSet::TwoDim(_) => Err(MonitorError::InvalidInput(
                "1-D operation on a 2-D bin-set",
            )),
        }
    }

    pub fn fill_1d(
        &self,
        metric: Metric,
        category: Category,
        value: Real,
    ) -> Result<(), MonitorError> {
        self.with_1d(metric, category, |hist| {
            hist.fill(value);
            Ok(())
        })
    }

    pub fn fill_2d(
        &self,
        metric: Metric,
        category: Category,
        x: Real,
        y: Real,
    ) -> Result<(), MonitorError> {
        let key = BinKey { metric, category };
        let slot = self.bin_set(&key)?;
        let mut bin_set = slot.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *bin_set {
            BinSet::TwoDim(hist) => {
                hist.fill(x, y);
                Ok(())
            }
            BinSet::OneDim(_) => Err(MonitorError::InvalidInput(
                "2-D operation on a 1-D bin-set",
            )),
        }
    }

    pub fn set_bin_1d(
        &self,
        metric: Metric,
        category: Category,
        index: usize,
        value: Real,
    ) -> Result<(), MonitorError> {
        self.with_1d(metric, category, |hist| hist.set_bin(index, value))
    }

    pub fn add_to_bin_1d(
        &self,
        metric: Metric,
        category: Category,
        index: usize,
        delta: Real,
    ) -> Result<(), MonitorError> {
        self.with_1d(metric, category, |hist| hist.add_to_bin(index, delta))
    }

    pub fn bin_content_1d(
        &self,
        metric: Metric,
        category: Category,
        index: usize,
    ) -> Result<Real, MonitorError> {
        self.with_1d(metric, category, |hist| hist.bin_content(index))
    }

    /// Read-only traversal for export. Each bin-set is locked individually,
    /// so the visitor observes a value committed by some completed fill per
    /// key; store-wide atomicity across keys is deliberately not provided.
    pub fn for_each_bin(&self, mut visitor: impl FnMut(&BinKey, &BinSet)) {
        let entries: Vec<(BinKey, Arc<Mutex<BinSet>>)> = self
            .bins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, slot)| (*key, Arc::clone(slot)))
            .collect();

        for (key, slot) in entries {
            let bin_set = slot.lock().unwrap_or_else(PoisonError::into_inner);
            visitor(&key, &bin_set);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::seq::SliceRandom;
    use tac_monitor_common::FeatureMethod;

    fn category(index: u8) -> Category {
        Category::new(index).unwrap()
    }

    fn amplitude() -> Metric {
        Metric::Amplitude(FeatureMethod::FromWaveform)
    }

    #[test]
    fn fill_without_ensure_is_unknown_key() {
        let store = AggregationStore::new();
        assert!(matches!(
            store.fill_1d(amplitude(), category(0), 1.0),
            Err(MonitorError::UnknownKey(_))
        ));
    }

    #[test]
    fn ensure_is_idempotent_and_first_definition_wins() {
        let store = AggregationStore::new();
        store.ensure_1d(amplitude(), category(0), Axis::new(10, 0.0, 10.0));
        store.fill_1d(amplitude(), category(0), 5.0).unwrap();

        // Re-ensuring, even with different binning, keeps the existing
        // bin-set and its counts.
        store.ensure_1d(amplitude(), category(0), Axis::new(2, 0.0, 100.0));
        assert_approx_eq!(store.bin_content_1d(amplitude(), category(0), 5).unwrap(), 1.0);
        let mut seen = 0;
        store.for_each_bin(|_, bin_set| {
            seen += 1;
            match bin_set {
                BinSet::OneDim(hist) => assert_eq!(hist.axis().bins(), 10),
                BinSet::TwoDim(_) => panic!("unexpected 2-D bin-set"),
            }
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn same_metric_different_categories_are_distinct() {
        let store = AggregationStore::new();
        store.ensure_1d(amplitude(), category(1), Axis::new(10, 0.0, 10.0));
        store.ensure_1d(amplitude(), category(2), Axis::new(10, 0.0, 10.0));
        store.fill_1d(amplitude(), category(1), 3.0).unwrap();

        assert_approx_eq!(store.bin_content_1d(amplitude(), category(1), 3).unwrap(), 1.0);
        assert_approx_eq!(store.bin_content_1d(amplitude(), category(2), 3).unwrap(), 0.0);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let store = AggregationStore::new();
        store.ensure_2d(
            amplitude(),
            category(0),
            Axis::new(4, 0.0, 4.0),
            Axis::new(4, 0.0, 4.0),
        );
        assert!(store.fill_1d(amplitude(), category(0), 1.0).is_err());
    }

    #[test]
    fn direct_bin_mutation() {
        let store = AggregationStore::new();
        store.ensure_1d(Metric::WaveformShape, category(0), Axis::new(4, 0.0, 4.0));
        store
            .set_bin_1d(Metric::WaveformShape, category(0), 2, 40.0)
            .unwrap();
        store
            .add_to_bin_1d(Metric::WaveformShape, category(0), 2, 2.0)
            .unwrap();
        assert_approx_eq!(
            store
                .bin_content_1d(Metric::WaveformShape, category(0), 2)
                .unwrap(),
            42.0
        );
    }

    // Final counts for a key must be independent of fill interleaving.
    #[test]
    fn concurrent_fills_commute() {
        let store = AggregationStore::new();
        store.ensure_1d(amplitude(), category(0), Axis::new(10, 0.0, 10.0));

        let mut values: Vec<Real> = (0..400).map(|i| (i % 10) as Real).collect();
        values.shuffle(&mut rand::rng());

        let store = &store;
        std::thread::scope(|scope| {
            for chunk in values.chunks(100) {
                scope.spawn(move || {
                    for &value in chunk {
                        store.fill_1d(amplitude(), category(0), value).unwrap();
                    }
                });
            }
        });

        for bin in 0..10 {
            assert_approx_eq!(
                store.bin_content_1d(amplitude(), category(0), bin).unwrap(),
                40.0
            );
        }
    }

    // Racing creation on the same fresh key must leave exactly one entry.
    #[test]
    fn concurrent_ensure_resolves_to_one_definition() {
        let store = AggregationStore::new();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    store.ensure_1d(amplitude(), category(0), Axis::new(10, 0.0, 10.0));
                    store.fill_1d(amplitude(), category(0), 5.0).unwrap();
                });
            }
        });

        let mut seen = 0;
        store.for_each_bin(|_, _| seen += 1);
        assert_eq!(seen, 1);
        assert_approx_eq!(store.bin_content_1d(amplitude(), category(0), 5).unwrap(), 8.0);
    }

    // Export runs while writers are active and still sees committed values.
    #[test]
    fn traversal_during_concurrent_fills() {
        let store = AggregationStore::new();
        store.ensure_1d(amplitude(), category(0), Axis::new(1, 0.0, 1.0));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..1000 {
                    store.fill_1d(amplitude(), category(0), 0.5).unwrap();
                }
            });
            scope.spawn(|| {
                for _ in 0..50 {
                    store.for_each_bin(|_, bin_set| {
                        let BinSet::OneDim(hist) = bin_set else {
                            panic!("unexpected 2-D bin-set");
                        };
                        // Whatever is observed must be a whole number of
                        // committed fills.
                        let content = hist.bin_content(0).unwrap();
                        assert_approx_eq!(content.fract(), 0.0);
                        assert!(content <= 1000.0);
                    });
                }
            });
        });

        assert_approx_eq!(store.bin_content_1d(amplitude(), category(0), 0).unwrap(), 1000.0);
    }
}
