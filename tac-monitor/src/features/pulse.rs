use crate::event::PulseRecord;
use tac_monitor_common::Real;

/// A derived (amplitude, time) pair describing one detected pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
    pub amplitude: Real,
    pub time: Real,
}

/// Selects the single representative pulse among the candidates for one
/// channel in one event: strictly greatest amplitude wins, ties keep the
/// first candidate found. Returns `None` when there are no candidates, in
/// which case downstream aggregation is skipped without error.
pub fn select_best<'a>(
    pulses: impl IntoIterator<Item = &'a PulseRecord>,
) -> Option<&'a PulseRecord> {
    let mut best: Option<&PulseRecord> = None;
    for pulse in pulses {
        match best {
            Some(current) if pulse.amplitude <= current.amplitude => {}
            _ => best = Some(pulse),
        }
    }
    best
}

/// Amplitudes at or above the readout ceiling are reported as the overflow
/// sentinel. Applied independently to waveform-derived and pulse-derived
/// amplitudes.
pub fn clamp_amplitude(amplitude: Real, ceiling: Real, sentinel: Real) -> Real {
    if amplitude >= ceiling {
        sentinel
    } else {
        amplitude
    }
}
