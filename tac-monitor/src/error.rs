use crate::aggregation::BinKey;
use tac_monitor_common::Channel;
use thiserror::Error;

/// Errors raised inside the monitoring core. All of them are local to one
/// (event, category, branch) combination; the pipeline logs and skips, it
/// never aborts the event stream.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("no bin-set registered for key {0}")]
    UnknownKey(BinKey),

    #[error("found {count} readout waveforms on channel {channel}, expected exactly one")]
    AmbiguousSource { channel: Channel, count: usize },

    #[error("no readout waveform found on channel {channel}")]
    MissingSource { channel: Channel },

    #[error("snapshot serialization failed")]
    SnapshotEncode(#[from] serde_json::Error),

    #[error("snapshot write failed")]
    SnapshotWrite(#[from] std::io::Error),
}
