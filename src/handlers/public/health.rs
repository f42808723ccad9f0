// handlers/public/health.rs - GET /health handler

use axum::extract::State;
use serde_json::json;

use crate::app::AppState;
use crate::middleware::ApiResponse;

/// GET /health - liveness plus connection pool occupancy
pub async fn health(State(state): State<AppState>) -> ApiResponse<serde_json::Value> {
    let stats = state.source.stats();

    ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "database": stats,
    }))
}
