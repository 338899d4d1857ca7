use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::Identity;
use crate::middleware::{ApiResponse, ApiResult, Json};
use crate::services::{SendReport, SendRequest, SubscribeRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UnsubscribeBody {
    pub endpoint: Option<String>,
}

/// POST /api/push/subscribe - Register the caller's browser for push
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<SubscribeRequest>,
) -> ApiResult<Value> {
    state.push_service().subscribe(&identity, body).await?;
    Ok(ApiResponse::success(json!({ "subscribed": true })))
}

/// DELETE /api/push/subscribe - Forget one of the caller's endpoints
pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<UnsubscribeBody>,
) -> ApiResult<Value> {
    let removed = state.push_service().unsubscribe(&identity, body.endpoint).await?;
    Ok(ApiResponse::success(json!({ "removed": removed })))
}

/// POST /api/push/send - Fan a notification out (internal key only)
pub async fn send(State(state): State<AppState>, Json(body): Json<SendRequest>) -> ApiResult<SendReport> {
    let report = state.push_service().send(body).await?;
    Ok(ApiResponse::success(report))
}
