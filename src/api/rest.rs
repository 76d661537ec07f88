use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use crate::domain::compliance_service::{ComplianceService, DesiredStateDocument, RunFilter, RunMode, RunReport};
use crate::domain::controller::ControlInfo;

/// Shared application state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ComplianceService>,
    pub started_at: Instant,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub controls: usize,
}

/// A desired-state document plus an optional filter.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(flatten)]
    pub document: DesiredStateDocument,
    #[serde(default)]
    pub filter: RunFilter,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/controls", get(controls))
        .route("/api/v1/check", post(check))
        .route("/api/v1/remediate", post(remediate))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        controls: state.service.controls().len(),
    })
}

async fn controls(State(state): State<AppState>) -> Json<Vec<ControlInfo>> {
    Json(state.service.controls())
}

async fn check(
    State(state): State<AppState>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunReport>, (StatusCode, String)> {
    run(state, req, RunMode::Check).await
}

async fn remediate(
    State(state): State<AppState>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunReport>, (StatusCode, String)> {
    run(state, req, RunMode::Remediate).await
}

/// Controllers block on vendor I/O, so each run gets a blocking thread.
async fn run(state: AppState, req: RunRequest, mode: RunMode) -> Result<Json<RunReport>, (StatusCode, String)> {
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || service.run(&req.document, &req.filter, mode))
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "compliance run panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}
