// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logging and metrics for one node process.
///
/// Constructed once in `main` and handed to whoever renders metrics; nothing
/// here lives in a static.
#[derive(Clone, Default)]
pub struct Telemetry {
    prometheus: Option<PrometheusHandle>,
}

impl Telemetry {
    /// Install the tracing subscriber and the Prometheus recorder.
    pub fn init() -> Self {
        // 1. Logs
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tessera_node=debug,tower_http=debug"));
        if tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .is_err()
        {
            tracing::warn!("tracing subscriber already installed");
        }

        // 2. Metrics
        let prometheus = match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "prometheus recorder not installed");
                None
            }
        };

        describe();
        metrics::gauge!("tessera_node_up", 1.0);

        Self { prometheus }
    }

    /// Handle without a recorder; `/metrics` reports that metrics are off.
    pub fn disabled() -> Self {
        Self { prometheus: None }
    }

    pub fn render(&self) -> String {
        match &self.prometheus {
            Some(handle) => handle.render(),
            None => "# metrics not initialized\n".to_string(),
        }
    }
}

fn describe() {
    metrics::describe_counter!("tessera_ticks_total", "Ticks executed (leader) or replayed (follower)");
    metrics::describe_counter!("tessera_epochs_published_total", "Epochs published to the log");
    metrics::describe_counter!("tessera_epochs_replayed_total", "Epochs replayed from the log");
    metrics::describe_counter!("tessera_commands_accepted_total", "Commands accepted by the leader");
    metrics::describe_counter!("tessera_commands_rejected_total", "Commands rejected, labelled by code");
    metrics::describe_counter!("tessera_snapshots_written_total", "Snapshots written to storage");
    metrics::describe_counter!("tessera_snapshot_failures_total", "Snapshot captures or writes that failed");
    metrics::describe_gauge!("tessera_tick_height", "Next tick height");
    metrics::describe_gauge!("tessera_epoch_height", "Epoch currently being filled");
    metrics::describe_histogram!("tessera_restore_duration_seconds", "Time taken to restore a snapshot");
}
