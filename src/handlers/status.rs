use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service descriptor
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Support Desk API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant support dashboard backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "whoami": "/api/auth/whoami (protected)",
                "sessions": "/api/sessions, /api/sessions/:id/escalations (protected)",
                "messages": "/api/messages?session_id= (protected)",
                "reply": "/api/reply (protected)",
                "teams": "/api/admin/teams (protected, admin)",
                "users": "/api/admin/users (protected, admin)",
                "push": "/api/push/subscribe (protected), /api/push/send (internal key)",
            }
        }
    }))
}

/// GET /health - Store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "details": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
