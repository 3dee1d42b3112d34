//! CLI binary to inspect master quorum health from snapshot files.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clusterview_masters::MastersMonitor;
use clusterview_masters::snapshot::decode_alerts;
use clusterview_masters_mock::MockMastersSource;
use tracing::info;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Snapshot file could not be loaded
    #[error("snapshot error: {0}")]
    Snapshot(#[from] clusterview_masters_mock::Error),

    /// Masters aggregation error
    #[error(transparent)]
    Masters(#[from] clusterview_masters::MastersError),

    /// Alerts file could not be read
    #[error("alerts file error: {0}")]
    AlertsFile(#[from] std::io::Error),

    /// Output could not be encoded
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Name of the cluster the snapshots were taken from
    #[arg(long, default_value = "local", env = "MASTERS_CLUSTER")]
    cluster: String,

    /// Topology snapshot (JSON)
    #[arg(long, env = "MASTERS_TOPOLOGY_FILE")]
    topology: PathBuf,

    /// Runtime data snapshot (JSON)
    #[arg(long, env = "MASTERS_RUNTIME_DATA_FILE")]
    runtime_data: Option<PathBuf>,

    /// Alert list (JSON array)
    #[arg(long, env = "MASTERS_ALERTS_FILE")]
    alerts: Option<PathBuf>,

    /// Print the aggregate on a single line
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();

    let source = MockMastersSource::from_files(&args.topology, args.runtime_data.as_ref())?;
    if let Some(path) = &args.alerts {
        source.set_alerts(decode_alerts(&std::fs::read_to_string(path)?)?);
    }

    let monitor = MastersMonitor::new(args.cluster.clone(), Arc::new(source));

    monitor.refresh_topology().await?;
    if args.runtime_data.is_some() {
        monitor.refresh_runtime_data().await?;
    }
    if args.alerts.is_some() {
        monitor.refresh_alerts().await?;
    }

    let state = monitor.state().await;
    let aggregate = state.aggregate();

    info!(
        "Cluster {}: {} secondary cells, primary quorum {}",
        args.cluster,
        aggregate.secondary().len(),
        aggregate
            .primary()
            .quorum()
            .map_or("unknown", |quorum| quorum.status.as_str())
    );

    let output = if args.compact {
        serde_json::to_string(&*state)?
    } else {
        serde_json::to_string_pretty(&*state)?
    };
    println!("{output}");

    Ok(())
}
