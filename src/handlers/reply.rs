use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::Identity;
use crate::handlers::require;
use crate::middleware::{ApiResponse, ApiResult, Json};
use crate::services::ReplyOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyBody {
    pub session_id: Option<Uuid>,
    pub message: Option<String>,
}

/// POST /api/reply - Post a staff reply into a session
///
/// The guest email goes out in the background; `emailSent` only reports
/// whether it was dispatched.
pub async fn post_reply(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<ReplyBody>,
) -> ApiResult<ReplyOutcome> {
    let session_id = require(body.session_id, "sessionId")?;
    let message = body.message.unwrap_or_default();
    let outcome = state.sessions().reply(&identity, session_id, &message).await?;
    Ok(ApiResponse::created(outcome))
}
