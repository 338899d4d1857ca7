use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::access::{AccessError, Identity};
use crate::handlers::require;
use crate::middleware::{ApiResponse, ApiResult, Json, Query};
use crate::services::{SessionAction, SessionOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatchBody {
    pub session_id: Option<Uuid>,
    pub action: Option<String>,
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkActionBody {
    pub action: Option<String>,
    pub customer_id: Option<Uuid>,
}

/// GET /api/sessions?customer_id= - Sessions across every customer the caller can see
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<SessionListQuery>,
) -> ApiResult<Value> {
    let sessions = state.sessions().list(&identity, query.customer_id).await?;
    Ok(ApiResponse::success(json!({ "sessions": sessions })))
}

/// PATCH /api/sessions - Apply one action to one session
///
/// Body: `{"sessionId": "...", "action": "markAsRead|markAsUnread|assign|delete", "data": {...}}`
pub async fn patch_session(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<SessionPatchBody>,
) -> ApiResult<SessionOutcome> {
    let session_id = require(body.session_id, "sessionId")?;
    let action = require(body.action, "action")?;
    let action = SessionAction::parse(&action, body.data)?;
    let outcome = state.sessions().apply(&identity, session_id, action).await?;
    Ok(ApiResponse::success(outcome))
}

/// POST /api/sessions - Bulk action over the caller's scope
///
/// Only `markAllAsRead` exists; `customerId` narrows it to one customer.
pub async fn bulk_session_action(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<BulkActionBody>,
) -> ApiResult<Value> {
    let action = require(body.action, "action")?;
    if action != "markAllAsRead" {
        return Err(AccessError::UnknownAction(action).into());
    }
    let updated = state.sessions().mark_all_as_read(&identity, body.customer_id).await?;
    Ok(ApiResponse::success(json!({ "action": "markAllAsRead", "updated": updated })))
}

/// GET /api/sessions/:id/escalations - Assignment audit trail, oldest first
pub async fn session_escalations(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Value> {
    let escalations = state.sessions().escalations(&identity, session_id).await?;
    Ok(ApiResponse::success(json!({ "escalations": escalations })))
}

/// GET /api/messages?session_id= - Messages of a session in creation order
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult<Value> {
    let session_id = require(query.session_id, "session_id")?;
    let messages = state.sessions().messages(&identity, session_id).await?;
    Ok(ApiResponse::success(json!({ "messages": messages })))
}
