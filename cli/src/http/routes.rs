use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::time::{Duration, Instant};

use chrono::Local;
use serde::Serialize;
use trustd_core::api as core_api;

use crate::http::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_id: String,
    pub uptime_seconds: f64,
    pub requests_handled: u64,
    pub errors: u64,
    pub timestamp: String,
    pub sandbox: core_api::StatsSnapshot,
    pub validation: core_api::ServiceSnapshot,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/validate", post(validate_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/shutdown", post(shutdown_handler))
        .with_state(state)
}

fn status_for(result: &core_api::ValidationResult) -> StatusCode {
    match result.error_code() {
        None => StatusCode::OK,
        Some(core_api::ErrorCode::Timeout) => StatusCode::REQUEST_TIMEOUT,
        Some(core_api::ErrorCode::BadInput | core_api::ErrorCode::Internal) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

/// POST /api/v1/validate
///
/// Bounded by `http_server.request_timeout_ms`; a request still queued or
/// running at that point gets a TIMEOUT body rather than an empty 408.
async fn validate_handler(
    State(state): State<AppState>,
    body: Result<Json<core_api::ValidationRequest>, JsonRejection>,
) -> (StatusCode, Json<core_api::ValidationResult>) {
    state.stats.increment_request();

    let result = match body {
        Ok(Json(req)) => {
            let started = Instant::now();
            let budget = Duration::from_millis(state.ctx.cfg().http_server.request_timeout_ms);
            match tokio::time::timeout(budget, state.ctx.validation().validate(req)).await {
                Ok(result) => result,
                Err(_) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    tracing::warn!(
                        error.kind = "http.request_timeout",
                        timeout_ms = budget.as_millis() as u64,
                        elapsed_ms
                    );
                    core_api::ValidationResult::from_error(
                        &core_api::SandboxError::Timeout { elapsed_ms },
                        elapsed_ms,
                    )
                }
            }
        }
        Err(rejection) => {
            tracing::warn!(error.kind = "http.bad_body", reason = %rejection.body_text());
            let err = core_api::SandboxError::InvalidPayload(format!(
                "malformed request body: {}",
                rejection.body_text()
            ));
            core_api::ValidationResult::from_error(&err, 0)
        }
    };

    let status = status_for(&result);
    if !status.is_success() {
        state.stats.increment_error();
    }
    (status, Json(result))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        session_id: state.session_id.clone(),
        uptime_seconds: state.stats.uptime_seconds(),
        requests_handled: state.stats.requests_total(),
        errors: state.stats.errors_total(),
        timestamp: Local::now().to_rfc3339(),
        sandbox: state.ctx.executor().stats(),
        validation: state.ctx.validation().snapshot(),
    })
}

/// POST /api/v1/shutdown
async fn shutdown_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let receivers = state.shutdown_tx.send(()).unwrap_or(0);
    tracing::info!(receivers, "shutdown requested over http");
    Json(serde_json::json!({
        "success": true,
        "message": "Shutdown signal sent"
    }))
}
