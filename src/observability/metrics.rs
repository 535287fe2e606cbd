//! Prometheus metrics for the lifecycle jobs.
//!
//! Every recording function is a no-op when the `prometheus` feature is
//! disabled, so callers never need to gate on it.

#[cfg(feature = "prometheus")]
use metrics::{counter, gauge, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime; the listener runs on it.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    let addr = config
        .listen_addr()
        .map_err(|e| MetricsError::Setup(e.to_string()))?;

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("_duration_seconds".to_string()),
            &config.run_duration_buckets_secs,
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?;

    let (recorder, exporter) = builder.build().map_err(MetricsError::Install)?;
    metrics::set_global_recorder(recorder)
        .map_err(|_| MetricsError::Setup("Metrics already initialized".to_string()))?;
    tokio::spawn(async move {
        if exporter.await.is_err() {
            tracing::error!("Prometheus exporter stopped");
        }
    });

    tracing::info!(listen = %addr, "Prometheus metrics endpoint listening");
    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(_config: &MetricsConfig) -> Result<(), MetricsError> {
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle Job Metrics
// ─────────────────────────────────────────────────────────────────────────────

/// Record the outcome of one event in a lifecycle run.
///
/// # Arguments
/// * `job` - "grace_period" or "retention"
/// * `outcome` - "transitioned", "stale", "failed", or "dry_run"
pub fn record_lifecycle_transition(job: &str, outcome: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "lifecycle_transitions_total",
            "job" => job.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (job, outcome);
    }
}

/// Record data deleted by a lifecycle job.
///
/// # Arguments
/// * `resource` - "sessions", "blobs", or "photos"
/// * `count` - The number of items deleted
pub fn record_lifecycle_deletion(job: &str, resource: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "lifecycle_deletions_total",
            "job" => job.to_string(),
            "resource" => resource.to_string()
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (job, resource, count);
    }
}

/// Record a lifecycle error, including swallowed ones.
///
/// `kind` is a short label such as "scan", "record_batch", "blob_folder",
/// "collection", or "notification".
pub fn record_lifecycle_error(job: &str, kind: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "lifecycle_errors_total",
            "job" => job.to_string(),
            "kind" => kind.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (job, kind);
    }
}

/// Record a completed lifecycle run.
pub fn record_lifecycle_run(job: &str, duration_secs: f64, stopped_early: bool) {
    #[cfg(feature = "prometheus")]
    {
        histogram!("lifecycle_run_duration_seconds", "job" => job.to_string())
            .record(duration_secs);
        counter!(
            "lifecycle_runs_total",
            "job" => job.to_string(),
            "stopped_early" => stopped_early.to_string()
        )
        .increment(1);
        gauge!("lifecycle_last_run_timestamp_seconds", "job" => job.to_string())
            .set(chrono::Utc::now().timestamp() as f64);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (job, duration_secs, stopped_early);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
