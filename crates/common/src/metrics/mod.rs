//! Metrics and observability utilities
//!
//! Prometheus metric descriptions and recording helpers with
//! standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all DocChat metrics
pub const METRICS_PREFIX: &str = "docchat";

/// Buckets for embedding latency (in seconds)
pub const EMBEDDING_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Chat metrics
    describe_counter!(
        format!("{}_chat_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat messages by routed intent"
    );

    // Retrieval metrics
    describe_counter!(
        format!("{}_retrieval_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total relevance ranking runs"
    );

    describe_counter!(
        format!("{}_retrieval_documents_scanned_total", METRICS_PREFIX),
        Unit::Count,
        "Documents scored against a query"
    );

    describe_counter!(
        format!("{}_retrieval_documents_matched_total", METRICS_PREFIX),
        Unit::Count,
        "Documents that met the relevance threshold"
    );

    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Relevance ranking latency in seconds"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API errors"
    );

    // Completion metrics
    describe_counter!(
        format!("{}_completion_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat-completion API requests"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record a routed chat message
pub fn record_chat(intent: &str) {
    counter!(
        format!("{}_chat_requests_total", METRICS_PREFIX),
        "intent" => intent.to_string()
    )
    .increment(1);
}

/// Helper to record a ranking run
pub fn record_retrieval(duration_secs: f64, scanned: usize, matched: usize) {
    counter!(format!("{}_retrieval_runs_total", METRICS_PREFIX)).increment(1);

    counter!(format!("{}_retrieval_documents_scanned_total", METRICS_PREFIX))
        .increment(scanned as u64);

    counter!(format!("{}_retrieval_documents_matched_total", METRICS_PREFIX))
        .increment(matched as u64);

    histogram!(format!("{}_retrieval_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_embedding_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a chat-completion call
pub fn record_completion(model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_completion_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
