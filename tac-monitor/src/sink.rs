//! Export of the aggregation store to the persistence collaborator.
//!
//! A snapshot is consistent bin-by-bin (see
//! [`AggregationStore::for_each_bin`]); the sink alone decides the on-disk
//! layout.

use crate::{
    aggregation::{AggregationStore, BinSet},
    error::MonitorError,
};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

/// One bin-set with its persistence name and category, plus binning
/// definition, counts and overflow/underflow totals.
#[derive(Debug, Clone, Serialize)]
pub struct BinSnapshot {
    pub name: String,
    pub category: u8,
    pub data: BinSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub written_at: DateTime<Utc>,
    pub bins: Vec<BinSnapshot>,
}

impl StoreSnapshot {
    pub fn capture(store: &AggregationStore) -> Self {
        let mut bins = Vec::new();
        store.for_each_bin(|key, bin_set| {
            bins.push(BinSnapshot {
                name: key.metric.to_string(),
                category: key.category.index() as u8,
                data: bin_set.clone(),
            });
        });
        // The store iterates in hash order; persisted output is sorted so
        // consecutive snapshots diff cleanly.
        let bins = bins
            .into_iter()
            .sorted_by(|a, b| a.name.cmp(&b.name).then(a.category.cmp(&b.category)))
            .collect();
        Self {
            written_at: Utc::now(),
            bins,
        }
    }
}

pub trait SnapshotSink {
    fn write_snapshot(&mut self, snapshot: &StoreSnapshot) -> Result<(), MonitorError>;
}

/// Writes each snapshot as a single JSON document, replacing the previous
/// one. The write goes to a sibling temp file first so a crash mid-write
/// never corrupts the last complete snapshot.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SnapshotSink for JsonFileSink {
    fn write_snapshot(&mut self, snapshot: &StoreSnapshot) -> Result<(), MonitorError> {
        let payload = serde_json::to_vec_pretty(snapshot)?;
        let staging = self.path.with_extension("part");
        fs::write(&staging, payload)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

/// Keeps snapshots in memory. Used by tests and embedding consumers that
/// handle persistence themselves; the handle can be cloned and inspected
/// while the pipeline owns the sink.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    snapshots: Arc<Mutex<Vec<StoreSnapshot>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<StoreSnapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotSink for MemorySink {
    fn write_snapshot(&mut self, snapshot: &StoreSnapshot) -> Result<(), MonitorError> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot.clone());
        Ok(())
    }
}
