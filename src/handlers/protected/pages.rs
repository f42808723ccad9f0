// handlers/protected/pages.rs - JSON API behind the Bearer token
//
// Envelope: {"success": true, ...payload} on success,
// {"success": false, "error": "..."} otherwise.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::Principal;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pipeline::{parse_id, PipelineError};

/// Parse the request body ourselves so a malformed body gets the same 400
/// envelope as a missing field.
fn json_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Bad page JSON payload: {}", e);
        ApiError::from(PipelineError::validation(e.to_string()))
    })
}

/// GET /api/pages
pub async fn list(State(state): State<AppState>) -> ApiResult<Value> {
    let pages = state.pipeline.api_list().await?;
    Ok(ApiResponse::success(json!({ "pages": pages })))
}

/// GET /api/pages/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let page = state.pipeline.api_get(parse_id(&id)?).await?;
    Ok(ApiResponse::success(json!({ "page": page })))
}

/// POST /api/pages - `{"name": ..., "content": ...}`
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> ApiResult<()> {
    let payload = json_body(&body)?;
    state.pipeline.api_create(&principal, &payload).await?;
    Ok(ApiResponse::created(()))
}

/// PUT /api/pages/:id - `{"content": ...}`
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let payload = json_body(&body)?;
    state.pipeline.api_update(&principal, id, &payload).await?;
    Ok(ApiResponse::ok())
}

/// DELETE /api/pages/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.pipeline.api_delete(&principal, parse_id(&id)?).await?;
    Ok(ApiResponse::ok())
}

/// POST /api/backup
pub async fn backup(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> ApiResult<Value> {
    let receipt = state.backup.backup(&principal).await?;
    Ok(ApiResponse::success(json!({ "url": receipt.url, "pages": receipt.pages })))
}
