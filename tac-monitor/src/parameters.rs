use crate::coincidence::{CoincidenceWindow, TaggerGroup};
use anyhow::{Error, anyhow};
use clap::Parser;
use std::str::FromStr;
use tac_monitor_common::{Category, Channel, Intensity, Real, TaggerKind, TriggerBits, categories_in};

/// Parses a coincidence window given as `centre,width`.
#[derive(Debug, Clone, Copy)]
pub struct TimeCutWrapper(pub(crate) CoincidenceWindow);

impl FromStr for TimeCutWrapper {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vals: Vec<_> = s.split(',').collect();
        if vals.len() == 2 {
            Ok(TimeCutWrapper(CoincidenceWindow {
                centre: Real::from_str(vals[0])?,
                width: Real::from_str(vals[1])?,
            }))
        } else {
            Err(anyhow!(
                "Incorrect number of parameters in time cut, expected pattern '*,*', got '{s}'"
            ))
        }
    }
}

/// Run parameters supplied once at start-up. Flattened into the binary's
/// Cli; library consumers go through [`MonitorConfig`] directly.
#[derive(Debug, Clone, Parser)]
pub struct MonitorParameters {
    /// Trigger bits the monitor cares about.
    #[clap(long, default_value = "2")]
    pub interest_mask: TriggerBits,

    /// Categories worth aggregating. Defaults to the interest mask.
    #[clap(long)]
    pub useful_mask: Option<TriggerBits>,

    /// Amplitudes at or above this ceiling are reported as the overflow sentinel.
    #[clap(long, default_value = "4095")]
    pub max_pulse_value: Real,

    #[clap(long, default_value = "4500")]
    pub overflow_pulse_value: Real,

    /// Threshold for the waveform crossing-time search, in ADC counts.
    #[clap(long, default_value = "400")]
    pub raw_threshold: Intensity,

    /// Width of one flash-ADC sample in nanoseconds.
    #[clap(long, default_value = "4.0")]
    pub sample_time_ns: Real,

    /// Channel identity the readout waveform is expected on.
    #[clap(long, default_value = "0")]
    pub readout_channel: Channel,

    #[clap(long, default_value = "90,20")]
    pub hodoscope_cut: TimeCutWrapper,

    #[clap(long, default_value = "90,20")]
    pub microscope_cut: TimeCutWrapper,

    /// Export the aggregation store every N accepted events.
    #[clap(long, default_value = "200000")]
    pub flush_stride: u64,
}

/// Immutable run configuration, constructed once at start-up and shared by
/// reference into the pipeline and its sub-components.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interest_mask: TriggerBits,
    pub useful_mask: TriggerBits,
    pub max_pulse_value: Real,
    pub overflow_pulse_value: Real,
    pub raw_threshold: Intensity,
    pub sample_time_ns: Real,
    pub readout_channel: Channel,
    pub hodoscope_cut: CoincidenceWindow,
    pub microscope_cut: CoincidenceWindow,
    pub flush_stride: u64,
}

impl From<MonitorParameters> for MonitorConfig {
    fn from(parameters: MonitorParameters) -> Self {
        Self {
            interest_mask: parameters.interest_mask,
            useful_mask: parameters.useful_mask.unwrap_or(parameters.interest_mask),
            max_pulse_value: parameters.max_pulse_value,
            overflow_pulse_value: parameters.overflow_pulse_value,
            raw_threshold: parameters.raw_threshold,
            sample_time_ns: parameters.sample_time_ns,
            readout_channel: parameters.readout_channel,
            hodoscope_cut: parameters.hodoscope_cut.0,
            microscope_cut: parameters.microscope_cut.0,
            // A zero stride would flush never; treat it as flush-per-event.
            flush_stride: parameters.flush_stride.max(1),
        }
    }
}

impl MonitorConfig {
    pub fn is_of_interest(&self, pattern: TriggerBits) -> bool {
        pattern & self.interest_mask != 0
    }

    /// Categories to process for an event with the given trigger pattern.
    pub fn active_categories(&self, pattern: TriggerBits) -> impl Iterator<Item = Category> {
        categories_in(pattern & self.interest_mask & self.useful_mask)
    }

    /// All categories bin-sets are reserved for.
    pub fn useful_categories(&self) -> impl Iterator<Item = Category> {
        categories_in(self.interest_mask & self.useful_mask)
    }

    pub fn tagger_groups(&self) -> [TaggerGroup; 2] {
        [
            TaggerGroup {
                kind: TaggerKind::Hodoscope,
                window: self.hodoscope_cut,
            },
            TaggerGroup {
                kind: TaggerKind::Microscope,
                window: self.microscope_cut,
            },
        ]
    }
}
