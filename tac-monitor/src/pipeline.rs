//! Per-event orchestration: category select, feature extraction,
//! coincidence correlation and aggregation, plus the periodic snapshot
//! export.
//!
//! One pipeline is shared by all worker threads. Every invocation runs to
//! completion; failures are confined to a single (event, category, branch)
//! combination and never abort the event stream.

use crate::{
    aggregation::{AggregationStore, Axis, Metric},
    coincidence::TaggerGroup,
    error::MonitorError,
    event::{RawWaveform, ReadoutEvent, TaggerHit},
    features::{self, Feature},
    parameters::MonitorConfig,
    sink::{SnapshotSink, StoreSnapshot},
};
use metrics::counter;
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};
use tac_monitor_common::{
    Category, Channel, FeatureMethod, Real, TaggerKind,
    metrics::{
        failures::{self, FailureKind},
        metric_names::{EVENTS_PROCESSED, EVENTS_SKIPPED, FAILURES, SNAPSHOTS_WRITTEN},
    },
};
use tracing::{debug, warn};

/// Bin-set definitions, mirroring the monitored quantities of the readout.
const AMPLITUDE_AXIS: (usize, Real, Real) = (500, 0.0, 5000.0);
const TIME_AXIS: (usize, Real, Real) = (200, 0.0, 400.0);
const SHAPE_AXIS: (usize, Real, Real) = (100, 0.0, 100.0);
const HODOSCOPE_ID_AXIS: (usize, Real, Real) = (320, 0.0, 320.0);
const MICROSCOPE_ID_AXIS: (usize, Real, Real) = (128, 0.0, 128.0);

const METHODS: [FeatureMethod; 2] = [FeatureMethod::FromWaveform, FeatureMethod::FromPulses];

fn axis((bins, lo, hi): (usize, Real, Real)) -> Axis {
    Axis::new(bins, lo, hi)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// At least one category of the event was aggregated.
    Processed,
    /// The trigger pattern did not intersect the interest mask.
    Skipped,
}

pub struct EventPipeline<S> {
    config: Arc<MonitorConfig>,
    store: AggregationStore,
    groups: [TaggerGroup; 2],
    sink: Mutex<S>,
    accepted: AtomicU64,
}

impl<S: SnapshotSink> EventPipeline<S> {
    /// Builds the pipeline and reserves every bin-set the configuration can
    /// reach, so fills during event processing never race creation.
    pub fn new(config: Arc<MonitorConfig>, sink: S) -> Self {
        let pipeline = Self {
            groups: config.tagger_groups(),
            config,
            store: AggregationStore::new(),
            sink: Mutex::new(sink),
            accepted: AtomicU64::new(0),
        };
        pipeline.create_bin_sets();
        pipeline
    }

    fn create_bin_sets(&self) {
        for category in self.config.useful_categories() {
            self.store
                .ensure_1d(Metric::WaveformShape, category, axis(SHAPE_AXIS));
            self.store
                .ensure_1d(Metric::WaveformShapeSum, category, axis(SHAPE_AXIS));
            self.store
                .ensure_1d(Metric::WaveformShapeEntries, category, axis(SHAPE_AXIS));
            self.store
                .ensure_1d(Metric::WaveformShapeAverage, category, axis(SHAPE_AXIS));

            for method in METHODS {
                self.store
                    .ensure_1d(Metric::Amplitude(method), category, axis(AMPLITUDE_AXIS));
                self.store
                    .ensure_1d(Metric::FeatureTime(method), category, axis(TIME_AXIS));

                for group in &self.groups {
                    let id_axis = match group.kind {
                        TaggerKind::Hodoscope => axis(HODOSCOPE_ID_AXIS),
                        TaggerKind::Microscope => axis(MICROSCOPE_ID_AXIS),
                    };
                    self.store.ensure_1d(
                        Metric::TaggerTime(group.kind, method),
                        category,
                        axis(TIME_AXIS),
                    );
                    self.store.ensure_2d(
                        Metric::TaggerTimeVsId(group.kind, method),
                        category,
                        id_axis,
                        axis(TIME_AXIS),
                    );
                    self.store.ensure_2d(
                        Metric::FeatureTimeVsTaggerTime(group.kind, method),
                        category,
                        axis(TIME_AXIS),
                        axis(TIME_AXIS),
                    );
                    self.store.ensure_2d(
                        Metric::MatchedAmplitudeVsId(group.kind, method),
                        category,
                        id_axis,
                        axis(AMPLITUDE_AXIS),
                    );
                    self.store.ensure_1d(
                        Metric::MatchedId(group.kind, method),
                        category,
                        id_axis,
                    );
                }
            }
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    /// Processes one accepted event. Never fails; all per-branch errors are
    /// logged, counted and contained.
    pub fn process(&self, event: &ReadoutEvent) -> EventOutcome {
        if !self.config.is_of_interest(event.trigger_pattern) {
            counter!(EVENTS_SKIPPED).increment(1);
            return EventOutcome::Skipped;
        }

        for category in self.config.active_categories(event.trigger_pattern) {
            self.process_category(event, category);
        }

        counter!(EVENTS_PROCESSED).increment(1);
        let accepted = self.accepted.fetch_add(1, Ordering::Relaxed) + 1;
        if accepted % self.config.flush_stride == 0 {
            self.flush();
        }
        EventOutcome::Processed
    }

    /// One fully independent pass over a single active category. The
    /// waveform and pulse branches are isolated from each other: a missing
    /// or ambiguous raw record skips only the waveform-derived fills.
    fn process_category(&self, event: &ReadoutEvent, category: Category) {
        match select_single_waveform(&event.waveforms, self.config.readout_channel) {
            Ok(waveform) => self.process_waveform(event, category, waveform),
            Err(error) => {
                warn!("skipping waveform branch for category {category}: {error}");
                self.count_failure(&error);
            }
        }

        self.process_pulses(event, category);
    }

    fn process_waveform(&self, event: &ReadoutEvent, category: Category, waveform: &RawWaveform) {
        self.record(self.record_waveform_shape(category, waveform));

        let amplitude = match features::find_peak(&waveform.samples) {
            Ok((_, value)) => features::clamp_amplitude(
                value as Real,
                self.config.max_pulse_value,
                self.config.overflow_pulse_value,
            ),
            Err(error) => {
                warn!("skipping waveform branch for category {category}: {error}");
                self.count_failure(&error);
                return;
            }
        };
        self.record(self.store.fill_1d(
            Metric::Amplitude(FeatureMethod::FromWaveform),
            category,
            amplitude,
        ));

        match features::find_threshold_crossing(&waveform.samples, self.config.raw_threshold) {
            Some(index) => {
                let time = index as Real * self.config.sample_time_ns;
                self.record(self.store.fill_1d(
                    Metric::FeatureTime(FeatureMethod::FromWaveform),
                    category,
                    time,
                ));
                self.correlate_feature(
                    event,
                    category,
                    FeatureMethod::FromWaveform,
                    Feature { amplitude, time },
                );
            }
            None => debug!("no threshold crossing in waveform, category {category}"),
        }
    }

    /// Maintains the per-sample shape series: last window, running sum,
    /// entry count and recomputed average. Windows longer than the shape
    /// axis are truncated to it.
    ///
    /// Each series lives behind its own lock, so with concurrent events on
    /// the same category the average may transiently be computed from a sum
    /// and entry count that straddle another event's update. The stored
    /// average is last-writer-wins and the next recompute corrects it; the
    /// sum and entry series themselves are never lossy.
    fn record_waveform_shape(
        &self,
        category: Category,
        waveform: &RawWaveform,
    ) -> Result<(), MonitorError> {
        let bins = SHAPE_AXIS.0;
        for (index, &sample) in waveform.samples.iter().take(bins).enumerate() {
            let value = sample as Real;
            self.store
                .set_bin_1d(Metric::WaveformShape, category, index, value)?;
            self.store
                .add_to_bin_1d(Metric::WaveformShapeEntries, category, index, 1.0)?;
            self.store
                .add_to_bin_1d(Metric::WaveformShapeSum, category, index, value)?;

            let entries = self
                .store
                .bin_content_1d(Metric::WaveformShapeEntries, category, index)?;
            let sum = self
                .store
                .bin_content_1d(Metric::WaveformShapeSum, category, index)?;
            // Zero entries means no data yet, reported as zero rather than
            // a division error.
            let average = if entries > 0.0 { sum / entries } else { 0.0 };
            self.store
                .set_bin_1d(Metric::WaveformShapeAverage, category, index, average)?;
        }
        Ok(())
    }

    fn process_pulses(&self, event: &ReadoutEvent, category: Category) {
        let best = features::select_best(
            event
                .pulses
                .iter()
                .filter(|pulse| pulse.channel == self.config.readout_channel),
        );
        // No candidate pulses is a normal condition, not an error.
        let Some(best) = best else {
            return;
        };

        let amplitude = features::clamp_amplitude(
            best.amplitude,
            self.config.max_pulse_value,
            self.config.overflow_pulse_value,
        );
        self.record(self.store.fill_1d(
            Metric::Amplitude(FeatureMethod::FromPulses),
            category,
            amplitude,
        ));
        self.record(self.store.fill_1d(
            Metric::FeatureTime(FeatureMethod::FromPulses),
            category,
            best.time,
        ));
        self.correlate_feature(
            event,
            category,
            FeatureMethod::FromPulses,
            Feature {
                amplitude,
                time: best.time,
            },
        );
    }

    /// Fan-out of one extracted feature over both tagger groups: every hit
    /// feeds the unconditional time and time-vs-id bins, matched hits
    /// additionally feed the amplitude-vs-id and matched-id bins.
    fn correlate_feature(
        &self,
        event: &ReadoutEvent,
        category: Category,
        method: FeatureMethod,
        feature: Feature,
    ) {
        for group in &self.groups {
            let hits = event.tagger_hits(group.kind);
            for coincidence in
                group.correlate(hits, |hit: &TaggerHit| hit.counter, |hit| hit.time)
            {
                let counter_id = coincidence.counter as Real;
                self.record(self.store.fill_1d(
                    Metric::TaggerTime(group.kind, method),
                    category,
                    coincidence.time,
                ));
                self.record(self.store.fill_2d(
                    Metric::TaggerTimeVsId(group.kind, method),
                    category,
                    counter_id,
                    coincidence.time,
                ));
                self.record(self.store.fill_2d(
                    Metric::FeatureTimeVsTaggerTime(group.kind, method),
                    category,
                    feature.time,
                    coincidence.time,
                ));

                if coincidence.matched {
                    self.record(self.store.fill_2d(
                        Metric::MatchedAmplitudeVsId(group.kind, method),
                        category,
                        counter_id,
                        feature.amplitude,
                    ));
                    self.record(self.store.fill_1d(
                        Metric::MatchedId(group.kind, method),
                        category,
                        counter_id,
                    ));
                }
            }
        }
    }

    /// Exports a snapshot to the sink. A sink failure is reported but the
    /// in-memory state is untouched; the next flush retries with the
    /// accumulated counts.
    pub fn flush(&self) {
        let snapshot = StoreSnapshot::capture(&self.store);
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        match sink.write_snapshot(&snapshot) {
            Ok(()) => {
                counter!(SNAPSHOTS_WRITTEN).increment(1);
                debug!("exported {} bin-sets", snapshot.bins.len());
            }
            Err(error) => {
                warn!("snapshot export failed, keeping in-memory state: {error}");
                counter!(FAILURES, &[failures::get_label(FailureKind::SnapshotWriteFailed)])
                    .increment(1);
            }
        }
    }

    fn record(&self, result: Result<(), MonitorError>) {
        if let Err(error) = result {
            warn!("aggregation update failed: {error}");
            self.count_failure(&error);
        }
    }

    fn count_failure(&self, error: &MonitorError) {
        let kind = match error {
            MonitorError::InvalidInput(_) => FailureKind::InvalidInput,
            MonitorError::UnknownKey(_) => FailureKind::UnknownKey,
            MonitorError::AmbiguousSource { .. } => FailureKind::AmbiguousSource,
            MonitorError::MissingSource { .. } => FailureKind::MissingSource,
            MonitorError::SnapshotEncode(_) | MonitorError::SnapshotWrite(_) => {
                FailureKind::SnapshotWriteFailed
            }
        };
        counter!(FAILURES, &[failures::get_label(kind)]).increment(1);
    }
}

/// Exactly one raw waveform is expected on the readout channel; zero or
/// several make the waveform-derived view unusable for this event.
fn select_single_waveform(
    waveforms: &[RawWaveform],
    channel: Channel,
) -> Result<&RawWaveform, MonitorError> {
    let mut matching = waveforms.iter().filter(|waveform| waveform.channel == channel);
    match (matching.next(), matching.next()) {
        (None, _) => Err(MonitorError::MissingSource { channel }),
        (Some(waveform), None) => Ok(waveform),
        (Some(_), Some(_)) => Err(MonitorError::AmbiguousSource {
            channel,
            count: waveforms
                .iter()
                .filter(|waveform| waveform.channel == channel)
                .count(),
        }),
    }
}
