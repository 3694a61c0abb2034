//! Prometheus text exposition of queue-watch metrics
//!
//! Served by the API at /metrics.

use crate::infra::metrics::{
    Metrics, MetricsSummary, ALERT_KINDS, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS,
};
use std::fmt::Write;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge)
fn write_metric(output: &mut String, name: &str, help: &str, typ: MetricType, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name} {val}");
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    bounds: &[u64; 10],
    avg: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in bounds.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{le=\"+Inf\"}} {cumulative}");

    let count: u64 = buckets.iter().sum();
    let sum = avg * count;
    let _ = writeln!(output, "{name}_sum {sum}");
    let _ = writeln!(output, "{name}_count {count}");
}

/// Format metrics in Prometheus text exposition format
pub fn format_prometheus_metrics(metrics: &Metrics) -> String {
    let summary = metrics.report();
    let mut output = String::with_capacity(4096);

    write_pipeline_metrics(&mut output, &summary);
    write_alert_metrics(&mut output, &summary);
    write_request_metrics(&mut output, &summary);

    output
}

fn write_pipeline_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "queue_watch_facilities",
        "Facilities with queue state",
        MetricType::Gauge,
        summary.facilities,
    );
    write_metric(
        output,
        "queue_watch_frames_total",
        "Detection frames processed",
        MetricType::Counter,
        summary.frames_total,
    );
    write_metric(
        output,
        "queue_watch_detections_total",
        "Person detections seen",
        MetricType::Counter,
        summary.detections_total,
    );
    write_metric(
        output,
        "queue_watch_detections_uncounted_total",
        "Person detections outside every zone",
        MetricType::Counter,
        summary.detections_uncounted_total,
    );
    write_metric(
        output,
        "queue_watch_ingests_total",
        "Occupancy updates applied",
        MetricType::Counter,
        summary.ingests_total,
    );
    write_metric(
        output,
        "queue_watch_analyses_total",
        "Pressure analyses run",
        MetricType::Counter,
        summary.analyses_total,
    );
    write_metric(
        output,
        "queue_watch_releases_total",
        "Emergency releases executed",
        MetricType::Counter,
        summary.releases_total,
    );
    write_metric(
        output,
        "queue_watch_optimizations_total",
        "Flow optimization runs applied",
        MetricType::Counter,
        summary.optimizations_total,
    );
    write_metric(
        output,
        "queue_watch_occupants_released_total",
        "Occupants removed by releases and optimizations",
        MetricType::Counter,
        summary.occupants_released_total,
    );
}

fn write_alert_metrics(output: &mut String, summary: &MetricsSummary) {
    let name = "queue_watch_alerts_total";
    let _ = writeln!(output, "# HELP {name} Alerts emitted by kind");
    let _ = writeln!(output, "# TYPE {name} counter");
    for (kind, count) in ALERT_KINDS.iter().zip(summary.alerts_total.iter()) {
        let _ = writeln!(output, "{name}{{kind=\"{}\"}} {count}", kind.as_str());
    }
}

fn write_request_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "queue_watch_requests_total",
        "API requests handled",
        MetricType::Counter,
        summary.requests_total,
    );
    write_histogram(
        output,
        "queue_watch_request_latency_us",
        "API request latency in microseconds",
        &summary.request_latency_buckets,
        &METRICS_BUCKET_BOUNDS,
        summary.request_latency_avg_us,
    );
    write_metric(
        output,
        "queue_watch_request_latency_p99_us",
        "99th percentile request latency",
        MetricType::Gauge,
        summary.request_latency_p99_us,
    );
}
