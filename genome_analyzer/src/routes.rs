// src/routes.rs

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::errors::AnalysisError;
use crate::models::{AnalysisResponse, AnalyzeBody};
use crate::service::{build_request, AnalysisService};

pub const ANALYZE_PATH: &str = "/api/genome/analyze";

pub struct AppState {
    pub service: AnalysisService,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(status))
        .route(ANALYZE_PATH, post(analyze))
        .with_state(state)
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "AlphaGenome analysis server",
        "status": "running",
        "engine": state.service.engine_kind().as_str(),
    }))
}

fn failure(err: &AnalysisError) -> (StatusCode, Json<AnalysisResponse>) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("Analysis failed ({}): {}", status, err);
    } else {
        info!("Analysis rejected ({}): {}", status, err);
    }
    (status, Json(AnalysisResponse::failure(err)))
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeBody>, JsonRejection>,
) -> (StatusCode, Json<AnalysisResponse>) {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return failure(&AnalysisError::invalid(rejection.body_text())),
    };

    let request = match build_request(body) {
        Ok(request) => request,
        Err(err) => return failure(&err),
    };

    match state.service.analyze(&request).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => failure(&err),
    }
}
