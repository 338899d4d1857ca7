use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::CustomerQuery;
use crate::access::Identity;
use crate::handlers::{double_option, require};
use crate::middleware::{ApiResponse, ApiResult, Json, Query};
use crate::services::{InviteOutcome, InviteRequest, MemberUpdateRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InviteBody {
    pub customer_id: Option<Uuid>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub customer_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub role: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub team_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveUserBody {
    pub customer_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub is_invite: bool,
}

/// GET /api/admin/users?customer_id= - Active members followed by pending invites (admin)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<Value> {
    let customer_id = require(query.customer_id, "customer_id")?;
    let users = state.members().list(&identity, customer_id).await?;
    Ok(ApiResponse::success(json!({ "users": users })))
}

/// POST /api/admin/users - Add an existing user or create an invite (admin)
///
/// Returns 201 with `{"type": "member_added", ...}` or
/// `{"type": "invite_created", "invite": {...}, "token": "..."}`.
pub async fn invite_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<InviteBody>,
) -> ApiResult<InviteOutcome> {
    let customer_id = require(body.customer_id, "customer_id")?;
    let request = InviteRequest {
        email: body.email.unwrap_or_default(),
        role: body.role,
        team_id: body.team_id,
    };
    let outcome = state.members().invite(&identity, customer_id, request).await?;
    Ok(ApiResponse::created(outcome))
}

/// PATCH /api/admin/users - Change role or team of a member (admin)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<UpdateUserBody>,
) -> ApiResult<Value> {
    let customer_id = require(body.customer_id, "customer_id")?;
    let user_id = require(body.user_id, "user_id")?;
    let request = MemberUpdateRequest {
        role: body.role,
        team_id: body.team_id,
    };
    state.members().update(&identity, customer_id, user_id, request).await?;
    Ok(ApiResponse::success(json!({ "updated": user_id })))
}

/// DELETE /api/admin/users - Remove a member or revoke an invite (admin)
pub async fn remove_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<RemoveUserBody>,
) -> ApiResult<Value> {
    let customer_id = require(body.customer_id, "customer_id")?;
    let user_id = require(body.user_id, "user_id")?;
    state
        .members()
        .remove(&identity, customer_id, user_id, body.is_invite)
        .await?;
    Ok(ApiResponse::success(json!({ "removed": user_id, "is_invite": body.is_invite })))
}
