use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::access::resolve;
use crate::auth::Principal;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the caller's `Identity` once per request. Runs after `jwt_auth_middleware`.
///
/// A caller without any access still gets through with an empty scope; the
/// handlers answer 403 or an empty list from there.
pub async fn resolve_identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let identity = resolve(
        state.store.as_ref(),
        &principal,
        state.config.security.legacy_email_superadmin,
    )
    .await?;

    tracing::debug!(
        "Resolved {} (superadmin: {}, scope empty: {})",
        principal.id,
        identity.is_superadmin,
        identity.accessible.is_empty()
    );

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
