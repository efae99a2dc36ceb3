use anyhow::{Context, Result};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::path::Path;
use tracing::{debug, info};

use crate::models::{StatusCounts, StatusKind};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Scan metrics
    pub static ref MANIFESTS_SCANNED: IntCounter = IntCounter::new(
        "composewatch_manifests_scanned_total",
        "Total number of compose manifests scanned"
    ).unwrap();

    pub static ref IMAGES_CHECKED: IntCounter = IntCounter::new(
        "composewatch_images_checked_total",
        "Total number of image references checked against a registry"
    ).unwrap();

    pub static ref SCAN_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "composewatch_scan_duration_seconds",
            "Time spent scanning manifests and querying registries"
        ).buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0])
    ).unwrap();

    pub static ref SCAN_RESULTS: IntGaugeVec = IntGaugeVec::new(
        Opts::new(
            "composewatch_scan_results",
            "Number of scanned images per update status in the last scan"
        ),
        &["status"]
    ).unwrap();

    // Registry metrics
    pub static ref REGISTRY_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "composewatch_registry_requests_total",
            "Total number of registry API requests"
        ),
        &["registry"]
    ).unwrap();

    pub static ref REGISTRY_REQUEST_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "composewatch_registry_request_failures_total",
            "Total number of registry API requests that returned no usable answer"
        ),
        &["registry", "reason"]
    ).unwrap();
}

pub fn register_metrics() {
    REGISTRY
        .register(Box::new(MANIFESTS_SCANNED.clone()))
        .ok();
    REGISTRY.register(Box::new(IMAGES_CHECKED.clone())).ok();
    REGISTRY.register(Box::new(SCAN_DURATION.clone())).ok();
    REGISTRY.register(Box::new(SCAN_RESULTS.clone())).ok();
    REGISTRY
        .register(Box::new(REGISTRY_REQUESTS_TOTAL.clone()))
        .ok();
    REGISTRY
        .register(Box::new(REGISTRY_REQUEST_FAILURES.clone()))
        .ok();

    debug!("Metrics registered");
}

/// Publish the per-status totals of the last scan
pub fn record_scan_results(counts: &StatusCounts) {
    for kind in StatusKind::ALL {
        SCAN_RESULTS
            .with_label_values(&[kind.as_str()])
            .set(counts.get(kind) as i64);
    }
}

/// Render the metrics registry in the Prometheus text exposition format
pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;

    String::from_utf8(buffer).context("Encoded metrics are not valid UTF-8")
}

/// Write the metrics registry to a file for the node-exporter textfile collector.
///
/// The file is written next to its destination first and renamed into place so a
/// collector never reads a half-written file.
pub fn write_textfile(path: &Path) -> Result<()> {
    let body = render()?;
    let tmp = path.with_extension("prom.tmp");

    std::fs::write(&tmp, body)
        .with_context(|| format!("Failed to write metrics to {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move metrics into {}", path.display()))?;

    info!("Metrics written to {}", path.display());
    Ok(())
}
