//! Feature extraction from raw waveforms and pre-digested pulse records.
//!
//! Both paths produce the same derived quantity, a [`Feature`] carrying an
//! amplitude and a time, but the two views are tracked independently
//! downstream under distinct metric names.

pub mod pulse;
pub mod waveform;

pub use pulse::{Feature, clamp_amplitude, select_best};
pub use waveform::{find_peak, find_threshold_crossing};
