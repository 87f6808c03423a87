//! Request handlers

use crate::api::error::ApiError;
use crate::service::{AppState, HealthCheck, HealthStatus};
use crate::types::{MatchmakingOutcome, MatchmakingRequest, OutcomeUpdate, Sport};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

pub async fn root_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "Welcome to the squadmatch AI matchmaking service",
        "service": state.config().service.name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "matchmake": "POST /matchmake",
            "update": "POST /update",
            "sports": "GET /sports",
            "health": "GET /health",
            "ready": "GET /ready",
            "alive": "GET /alive",
            "metrics": "GET /metrics"
        }
    }))
}

pub async fn matchmake_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MatchmakingRequest>, JsonRejection>,
) -> Result<Json<MatchmakingOutcome>, ApiError> {
    let Json(request) = payload?;
    debug!(
        "Matchmaking request from '{}' for {}",
        request.player_id, request.sport
    );

    let outcome = state.matchmake(&request).await?;
    Ok(Json(outcome))
}

pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OutcomeUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = payload?;
    debug!(
        "Outcome update from '{}' for match '{}'",
        update.player_id, update.match_id
    );

    let summary = state.record_outcome(&update).await?;
    Ok(Json(json!({
        "message": "Model updated successfully",
        "trained": summary.trained,
        "loss": summary.loss,
        "bufferSize": summary.buffer_size,
        "weightsSaved": summary.weights_saved,
    })))
}

pub async fn sports_handler() -> Json<Value> {
    let sports: Vec<&str> = Sport::ALL.iter().map(|sport| sport.name()).collect();
    Json(json!({ "sports": sports }))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    match HealthCheck::check(state).await {
        Ok(health) => {
            let status = match health.status {
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
                HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            };
            (status, Json(health)).into_response()
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            ApiError::Internal(format!("Health check failed: {}", e)).into_response()
        }
    }
}

/// Readiness check for orchestrators
pub async fn ready_handler(State(state): State<Arc<AppState>>) -> Response {
    check_response(HealthCheck::readiness_check(state).await, "ready")
}

/// Liveness check for orchestrators
pub async fn alive_handler(State(state): State<Arc<AppState>>) -> Response {
    check_response(HealthCheck::liveness_check(state).await, "alive")
}

fn check_response(result: anyhow::Result<HealthStatus>, check: &str) -> Response {
    match result {
        Ok(HealthStatus::Unhealthy) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "check": check, "ok": false, "status": HealthStatus::Unhealthy })),
        )
            .into_response(),
        Ok(status) => (
            StatusCode::OK,
            Json(json!({ "check": check, "ok": true, "status": status })),
        )
            .into_response(),
        Err(e) => {
            error!("{} check failed: {}", check, e);
            ApiError::Internal(format!("{} check failed: {}", check, e)).into_response()
        }
    }
}

pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics().render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}

/// CORS preflight
pub async fn preflight_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}
