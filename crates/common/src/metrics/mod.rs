//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with latency histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Sangkwon metrics
pub const METRICS_PREFIX: &str = "sangkwon";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
];

/// Buckets for chat-model latency (typically slower)
pub const LLM_BUCKETS: &[f64] = &[
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Query resolution metrics
    describe_counter!(
        format!("{}_rag_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total resolved queries, labelled by answer source"
    );

    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Vector retrieval latency in seconds"
    );

    describe_gauge!(
        format!("{}_retrieval_passages_count", METRICS_PREFIX),
        Unit::Count,
        "Number of usable passages returned from retrieval"
    );

    // Chat model metrics
    describe_counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat-model API requests"
    );

    describe_histogram!(
        format!("{}_llm_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Chat-model latency in seconds"
    );

    describe_counter!(
        format!("{}_llm_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat-model API errors"
    );

    // Data gateway metrics
    describe_counter!(
        format!("{}_gateway_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total external data-gateway requests"
    );

    describe_counter!(
        format!("{}_gateway_degraded_total", METRICS_PREFIX),
        Unit::Count,
        "External data-gateway failures degraded to neutral values"
    );

    // Analysis metrics
    describe_counter!(
        format!("{}_market_analyses_total", METRICS_PREFIX),
        Unit::Count,
        "Total composite market analyses"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a resolved query
pub fn record_rag_query(source: &str, retrieval_secs: f64, passage_count: usize) {
    counter!(
        format!("{}_rag_queries_total", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .increment(1);

    histogram!(format!("{}_retrieval_duration_seconds", METRICS_PREFIX)).record(retrieval_secs);

    gauge!(format!("{}_retrieval_passages_count", METRICS_PREFIX)).set(passage_count as f64);
}

/// Helper to record chat-model metrics
pub fn record_llm(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_llm_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_llm_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a data-gateway call
pub fn record_gateway(service: &str, degraded: bool) {
    counter!(
        format!("{}_gateway_requests_total", METRICS_PREFIX),
        "service" => service.to_string()
    )
    .increment(1);

    if degraded {
        counter!(
            format!("{}_gateway_degraded_total", METRICS_PREFIX),
            "service" => service.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a composite market analysis
pub fn record_market_analysis(duration_secs: f64) {
    counter!(format!("{}_market_analyses_total", METRICS_PREFIX)).increment(1);

    histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        "method" => "GET",
        "endpoint" => "/analyze_market"
    )
    .record(duration_secs);
}
