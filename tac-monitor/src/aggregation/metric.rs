use std::fmt::{self, Display};
use tac_monitor_common::{Category, FeatureMethod, TaggerKind};

/// Typed identifier of one monitored quantity. The live aggregation index is
/// keyed on this enum; the human-readable string form only exists at the
/// persistence boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Most recent readout window, one bin per sample index.
    WaveformShape,
    /// Running per-sample sum across all accepted events.
    WaveformShapeSum,
    /// Number of readout windows accumulated per sample index.
    WaveformShapeEntries,
    /// `sum / entries`, recomputed after each update.
    WaveformShapeAverage,

    Amplitude(FeatureMethod),
    FeatureTime(FeatureMethod),

    TaggerTime(TaggerKind, FeatureMethod),
    TaggerTimeVsId(TaggerKind, FeatureMethod),
    FeatureTimeVsTaggerTime(TaggerKind, FeatureMethod),
    MatchedAmplitudeVsId(TaggerKind, FeatureMethod),
    MatchedId(TaggerKind, FeatureMethod),
}

impl Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::WaveformShape => write!(f, "waveform_shape"),
            Metric::WaveformShapeSum => write!(f, "waveform_shape_sum"),
            Metric::WaveformShapeEntries => write!(f, "waveform_shape_entries"),
            Metric::WaveformShapeAverage => write!(f, "waveform_shape_average"),
            Metric::Amplitude(method) => write!(f, "amplitude_{method}"),
            Metric::FeatureTime(method) => write!(f, "feature_time_{method}"),
            Metric::TaggerTime(tagger, method) => write!(f, "{tagger}_time_{method}"),
            Metric::TaggerTimeVsId(tagger, method) => {
                write!(f, "{tagger}_time_vs_counter_{method}")
            }
            Metric::FeatureTimeVsTaggerTime(tagger, method) => {
                write!(f, "feature_time_vs_{tagger}_time_{method}")
            }
            Metric::MatchedAmplitudeVsId(tagger, method) => {
                write!(f, "matched_amplitude_vs_{tagger}_counter_{method}")
            }
            Metric::MatchedId(tagger, method) => write!(f, "matched_{tagger}_counter_{method}"),
        }
    }
}

/// Uniquely identifies one bin-set in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinKey {
    pub metric: Metric,
    pub category: Category,
}

impl Display for BinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.metric, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These names end up in persisted snapshots, so they are pinned here.
    #[test]
    fn metric_names_are_stable() {
        assert_eq!(
            Metric::Amplitude(FeatureMethod::FromWaveform).to_string(),
            "amplitude_from_waveform"
        );
        assert_eq!(
            Metric::FeatureTime(FeatureMethod::FromPulses).to_string(),
            "feature_time_from_pulses"
        );
        assert_eq!(
            Metric::MatchedId(TaggerKind::Hodoscope, FeatureMethod::FromPulses).to_string(),
            "matched_hodoscope_counter_from_pulses"
        );
        assert_eq!(
            Metric::FeatureTimeVsTaggerTime(TaggerKind::Microscope, FeatureMethod::FromWaveform)
                .to_string(),
            "feature_time_vs_microscope_time_from_waveform"
        );
    }

    #[test]
    fn key_name_carries_category() {
        let key = BinKey {
            metric: Metric::WaveformShape,
            category: Category::new(1).unwrap(),
        };
        assert_eq!(key.to_string(), "waveform_shape_1");
    }
}
