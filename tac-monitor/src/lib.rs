//! Online quality monitoring for a digitized-pulse detector readout stream.
//!
//! Each accepted event passes through one pipeline invocation which extracts
//! timing and amplitude features from the readout waveform and pulse records,
//! correlates them against the tagger detector groups, and accumulates the
//! results into category-indexed statistical bins. Multiple worker threads
//! may drive the pipeline concurrently; the aggregation store serialises
//! updates per bin-set key.

pub mod aggregation;
pub mod coincidence;
pub mod error;
pub mod event;
pub mod features;
pub mod parameters;
pub mod pipeline;
pub mod sink;

pub use error::MonitorError;
pub use parameters::{MonitorConfig, MonitorParameters};
pub use pipeline::{EventOutcome, EventPipeline};
