use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::CustomerQuery;
use crate::access::Identity;
use crate::database::models::TeamUpdate;
use crate::handlers::{double_option, require};
use crate::middleware::{ApiResponse, ApiResult, Json, Query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTeamBody {
    pub customer_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamBody {
    pub customer_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTeamBody {
    pub customer_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

/// GET /api/admin/teams?customer_id= - Teams with member counts
pub async fn list_teams(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<Value> {
    let customer_id = require(query.customer_id, "customer_id")?;
    let teams = state.teams().list(&identity, customer_id).await?;
    Ok(ApiResponse::success(json!({ "teams": teams })))
}

/// POST /api/admin/teams - Create a team (admin)
pub async fn create_team(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateTeamBody>,
) -> ApiResult<Value> {
    let customer_id = require(body.customer_id, "customer_id")?;
    let name = body.name.unwrap_or_default();
    let team = state
        .teams()
        .create(&identity, customer_id, &name, body.description)
        .await?;
    Ok(ApiResponse::created(json!({ "team": team })))
}

/// PATCH /api/admin/teams - Rename, describe or make default (admin)
pub async fn update_team(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<UpdateTeamBody>,
) -> ApiResult<Value> {
    let customer_id = require(body.customer_id, "customer_id")?;
    let team_id = require(body.team_id, "team_id")?;
    let update = TeamUpdate {
        name: body.name,
        description: body.description,
        is_default: body.is_default,
    };
    let team = state.teams().update(&identity, customer_id, team_id, update).await?;
    Ok(ApiResponse::success(json!({ "team": team })))
}

/// DELETE /api/admin/teams - Remove an empty team (admin)
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<DeleteTeamBody>,
) -> ApiResult<Value> {
    let customer_id = require(body.customer_id, "customer_id")?;
    let team_id = require(body.team_id, "team_id")?;
    state.teams().delete(&identity, customer_id, team_id).await?;
    Ok(ApiResponse::success(json!({ "deleted": team_id })))
}
