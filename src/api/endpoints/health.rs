//! Health and summary endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::core_state::ClinicState;
use crate::mock_api::ApiResponse;
use crate::seed::SeedStats;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app: &'static str,
    pub version: &'static str,
}

/// `GET /api/health`: liveness check.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: crate::config::APP_NAME,
        version: crate::config::APP_VERSION,
    })
}

/// `GET /api/stats`: live per-collection counts.
pub async fn stats(State(state): State<Arc<ClinicState>>) -> Json<ApiResponse<SeedStats>> {
    Json(ApiResponse::ok(state.collection_stats()))
}
