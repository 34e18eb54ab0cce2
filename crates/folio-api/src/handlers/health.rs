//! Health, info and metrics handlers

use crate::middleware::metrics;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: bool,
}

/// Readiness probe - checks the store
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.users.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness store check failed");
            false
        }
    };

    let response = ReadinessResponse {
        ready: state.is_ready() && database,
        database,
    };

    if response.ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Application info
#[derive(Serialize, ToSchema)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub prefix: String,
    pub server_time: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub total_requests: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/info",
    tag = "health",
    responses(
        (status = 200, description = "Application info", body = InfoResponse)
    )
)]
pub async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(InfoResponse {
        name: state.config.server.app_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        prefix: state.config.api_base(),
        server_time: Utc::now(),
        uptime_seconds: state.uptime_secs(),
        total_requests: state.get_request_count(),
    })
}

/// Prometheus-compatible metrics endpoint
pub async fn prometheus_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics::render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_reports_version() {
        let response = tokio_test::block_on(health_check()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_metrics_content_type() {
        let response = tokio_test::block_on(prometheus_metrics()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }
}
