//! Input records supplied by the event-delivery runtime, one set per
//! accepted event. The pipeline borrows them for the duration of a single
//! invocation and never stores them.

use serde::Deserialize;
use tac_monitor_common::{Channel, CounterId, Intensity, Real, TaggerKind, TriggerBits};

/// One flash-ADC readout window for a single channel.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWaveform {
    pub channel: Channel,
    pub samples: Vec<Intensity>,
}

/// A pre-digested pulse reported by the firmware for one channel. Zero or
/// more may exist per channel per event.
#[derive(Debug, Clone, Deserialize)]
pub struct PulseRecord {
    pub channel: Channel,
    pub amplitude: Real,
    pub time: Real,
}

/// A hit in one of the auxiliary tagger detector groups.
#[derive(Debug, Clone, Deserialize)]
pub struct TaggerHit {
    pub counter: CounterId,
    pub time: Real,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadoutEvent {
    pub trigger_pattern: TriggerBits,

    #[serde(default)]
    pub waveforms: Vec<RawWaveform>,

    #[serde(default)]
    pub pulses: Vec<PulseRecord>,

    #[serde(default)]
    pub hodoscope_hits: Vec<TaggerHit>,

    #[serde(default)]
    pub microscope_hits: Vec<TaggerHit>,
}

impl ReadoutEvent {
    pub fn tagger_hits(&self, kind: TaggerKind) -> &[TaggerHit] {
        match kind {
            TaggerKind::Hodoscope => &self.hodoscope_hits,
            TaggerKind::Microscope => &self.microscope_hits,
        }
    }
}
