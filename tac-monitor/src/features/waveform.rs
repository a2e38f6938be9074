use crate::error::MonitorError;
use tac_monitor_common::Intensity;

/// Returns the index and value of the maximum sample. Ties are broken by the
/// first occurrence, so the lowest index attaining the maximum wins.
///
/// An empty sequence is a caller precondition violation.
pub fn find_peak(samples: &[Intensity]) -> Result<(usize, Intensity), MonitorError> {
    let mut iter = samples.iter().copied().enumerate();
    let (mut peak_index, mut peak_value) = iter
        .next()
        .ok_or(MonitorError::InvalidInput("empty sample sequence"))?;
    for (index, value) in iter {
        if value > peak_value {
            peak_index = index;
            peak_value = value;
        }
    }
    Ok((peak_index, peak_value))
}

/// Returns the index of the first sample strictly greater than `threshold`,
/// or `None` when the waveform never crosses it. A crossing at index 0 is a
/// real crossing, distinct from the no-crossing case.
pub fn find_threshold_crossing(samples: &[Intensity], threshold: Intensity) -> Option<usize> {
    samples.iter().position(|&value| value > threshold)
}
