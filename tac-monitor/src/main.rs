use anyhow::Result;
use clap::Parser;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use rayon::prelude::*;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tac_monitor::{
    EventPipeline, MonitorConfig, MonitorParameters, event::ReadoutEvent, sink::JsonFileSink,
};
use tac_monitor_common::metrics::{
    failures::{self, FailureKind},
    metric_names::{
        EVENTS_PROCESSED, EVENTS_RECEIVED, EVENTS_SKIPPED, FAILURES, SNAPSHOTS_WRITTEN,
    },
};
use tracing::{info, warn};

// cargo run --bin tac-monitor -- --file-name events.jsonl --output-file snapshot.json --raw-threshold 400 --hodoscope-cut 90,20

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Recorded events to replay, one JSON document per line.
    #[clap(long)]
    file_name: PathBuf,

    /// Destination of the aggregated snapshot.
    #[clap(long)]
    output_file: PathBuf,

    #[clap(long, default_value = "127.0.0.1:9090")]
    observability_address: SocketAddr,

    #[clap(flatten)]
    parameters: MonitorParameters,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Cli::parse();

    let builder = PrometheusBuilder::new();
    builder
        .with_http_listener(args.observability_address)
        .install()
        .expect("prometheus metrics exporter should be setup");

    // Metrics
    metrics::describe_counter!(
        EVENTS_RECEIVED,
        metrics::Unit::Count,
        "Number of event records read"
    );
    metrics::describe_counter!(
        EVENTS_PROCESSED,
        metrics::Unit::Count,
        "Number of events aggregated"
    );
    metrics::describe_counter!(
        EVENTS_SKIPPED,
        metrics::Unit::Count,
        "Number of events outside the interest mask"
    );
    metrics::describe_counter!(
        FAILURES,
        metrics::Unit::Count,
        "Number of failures encountered"
    );
    metrics::describe_counter!(
        SNAPSHOTS_WRITTEN,
        metrics::Unit::Count,
        "Number of snapshots exported"
    );

    let config = Arc::new(MonitorConfig::from(args.parameters));
    let pipeline = EventPipeline::new(config, JsonFileSink::new(args.output_file));

    let events = read_events(&args.file_name)?;
    info!(
        "replaying {} events from {}",
        events.len(),
        args.file_name.display()
    );

    events.par_iter().for_each(|event| {
        pipeline.process(event);
    });

    pipeline.flush();
    Ok(())
}

/// Reads a JSON-lines event file. A malformed line is reported and dropped;
/// the remaining records are still replayed.
fn read_events(path: &Path) -> Result<Vec<ReadoutEvent>> {
    let file = File::open(path)?;
    let mut events = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        counter!(EVENTS_RECEIVED).increment(1);
        match serde_json::from_str(&line) {
            Ok(event) => events.push(event),
            Err(error) => {
                warn!("malformed record at line {}: {error}", index + 1);
                counter!(FAILURES, &[failures::get_label(FailureKind::MalformedRecord)])
                    .increment(1);
            }
        }
    }
    Ok(events)
}
