pub mod metric_names {
    use const_format::concatcp;

    pub const METRIC_NAME_PREFIX: &str = "tac_monitor_";

    pub const EVENTS_RECEIVED: &str = concatcp!(METRIC_NAME_PREFIX, "events_received");
    pub const EVENTS_PROCESSED: &str = concatcp!(METRIC_NAME_PREFIX, "events_processed");
    pub const EVENTS_SKIPPED: &str = concatcp!(METRIC_NAME_PREFIX, "events_skipped");
    pub const FAILURES: &str = concatcp!(METRIC_NAME_PREFIX, "failures");
    pub const SNAPSHOTS_WRITTEN: &str = concatcp!(METRIC_NAME_PREFIX, "snapshots_written");
}

pub mod failures {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        MissingSource,
        AmbiguousSource,
        UnknownKey,
        InvalidInput,
        SnapshotWriteFailed,
        MalformedRecord,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::MissingSource => "missing_source",
                FailureKind::AmbiguousSource => "ambiguous_source",
                FailureKind::UnknownKey => "unknown_key",
                FailureKind::InvalidInput => "invalid_input",
                FailureKind::SnapshotWriteFailed => "snapshot_write_failed",
                FailureKind::MalformedRecord => "malformed_record",
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::metric_names::*;

    // These names are what Prometheus scrapes; pinned so a prefix change is
    // a deliberate one.
    #[test]
    fn counter_names_carry_the_prefix() {
        for name in [
            EVENTS_RECEIVED,
            EVENTS_PROCESSED,
            EVENTS_SKIPPED,
            FAILURES,
            SNAPSHOTS_WRITTEN,
        ] {
            assert!(name.starts_with(METRIC_NAME_PREFIX));
        }
        assert_eq!(EVENTS_RECEIVED, "tac_monitor_events_received");
        assert_eq!(FAILURES, "tac_monitor_failures");
    }
}
