//! Prometheus Metrics Handler

use axum::{http::header, response::IntoResponse};

use crate::infrastructure::metrics;

/// Prometheus metrics endpoint handler
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics::gather_metrics(),
    )
}
