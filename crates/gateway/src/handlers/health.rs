//! Health check and metrics handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub storage: CheckResult,
    pub embedding_model: String,
    pub chat_model: String,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - checks the upload directory and reports the models
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let store = state.store.clone();
    let listing = tokio::task::spawn_blocking(move || store.list()).await;

    let storage = match listing {
        Ok(Ok(names)) => CheckResult {
            status: "up".to_string(),
            documents: Some(names.len()),
            error: None,
        },
        Ok(Err(e)) => CheckResult {
            status: "down".to_string(),
            documents: None,
            error: Some(e.to_string()),
        },
        Err(e) => CheckResult {
            status: "down".to_string(),
            documents: None,
            error: Some(e.to_string()),
        },
    };

    let all_healthy = storage.status == "up";

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks {
            storage,
            embedding_model: state.ranker.model_name().to_string(),
            chat_model: state.chat_model.model_name().to_string(),
        },
    })
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}
