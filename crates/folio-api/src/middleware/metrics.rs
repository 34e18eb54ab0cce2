//! Metrics tracking middleware
//!
//! Tracks request latency, counts, and status codes for Prometheus metrics

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

lazy_static! {
    pub static ref HTTP_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "folio_http_requests_total",
        "HTTP requests by endpoint and status",
        &["method", "endpoint", "status"]
    )
    .expect("metric registration");
    pub static ref HTTP_LATENCY: HistogramVec = register_histogram_vec!(
        "folio_http_request_duration_seconds",
        "HTTP request latency",
        &["method", "endpoint"]
    )
    .expect("metric registration");
    pub static ref REVOCATION_FAILURES: IntCounter = register_int_counter!(
        "folio_token_revocation_failures_total",
        "Access tokens that could not be written to the blacklist"
    )
    .expect("metric registration");
    pub static ref BLACKLIST_CHECK_FAILURES: IntCounter = register_int_counter!(
        "folio_blacklist_check_failures_total",
        "Blacklist reads that failed while authenticating a request"
    )
    .expect("metric registration");
}

/// Metrics tracking middleware
///
/// Records:
/// - Request count per endpoint and status
/// - Request latency distribution
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    state.increment_requests();
    let method = request.method().to_string();
    let endpoint = normalize_endpoint(request.uri().path());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS
        .with_label_values(&[&method, &endpoint, &status])
        .inc();
    HTTP_LATENCY
        .with_label_values(&[&method, &endpoint])
        .observe(start.elapsed().as_secs_f64());

    response
}

/// Render the default registry in the Prometheus text format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Normalize endpoint paths for consistent metrics
///
/// Replaces id and slug segments with placeholders to group similar endpoints
fn normalize_endpoint(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let mut normalized = Vec::with_capacity(segments.len());

    for (i, seg) in segments.iter().enumerate() {
        let previous = i.checked_sub(1).map(|p| segments[p]);
        if is_numeric(seg) {
            normalized.push(":id");
        } else if previous == Some("articles") && !seg.is_empty() && !segments[..i].contains(&"admin")
        {
            // Guest article lookups are by slug
            normalized.push(":slug");
        } else {
            normalized.push(seg);
        }
    }

    normalized.join("/")
}

/// Check if a string is numeric (likely an ID)
fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
