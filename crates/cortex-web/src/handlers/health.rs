//! Health and status handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub tools: Vec<String>,
    pub schema_cached: bool,
}

/// GET /api/health
pub async fn health_handler() -> &'static str {
    "OK"
}

/// GET /api/status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        tools: state.registry.names(),
        schema_cached: state.schema.is_cached().await,
    })
}
