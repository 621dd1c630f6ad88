use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use herald_rs_core::Orchestrator;
use herald_rs_protocol::{FailureKind, HealthReport, OrchestrationResult};
use log::debug;
use std::sync::Arc;

pub const SUBMIT_PATH: &str = "/store_report_and_notify";
pub const HEALTH_PATH: &str = "/health";

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route(SUBMIT_PATH, post(submit))
        .route(HEALTH_PATH, get(health))
        .with_state(orchestrator)
}

/// The body is parsed here rather than by an extractor so malformed JSON
/// still produces an orchestration result.
async fn submit(
    State(orchestrator): State<Arc<Orchestrator>>,
    body: Bytes,
) -> (StatusCode, Json<OrchestrationResult>) {
    debug!("task received (bytes={})", body.len());
    let result = orchestrator.submit_json(&body).await;
    (status_for(&result), Json(result))
}

async fn health(State(orchestrator): State<Arc<Orchestrator>>) -> Json<HealthReport> {
    Json(orchestrator.health())
}

/// HTTP status for a result.
pub fn status_for(result: &OrchestrationResult) -> StatusCode {
    if result.success {
        return StatusCode::OK;
    }
    match result.kind {
        Some(FailureKind::Input) => StatusCode::BAD_REQUEST,
        Some(FailureKind::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}
