use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::state::AppState;

pub const INTERNAL_KEY_HEADER: &str = "x-internal-api-key";

/// Guards service-to-service routes. Without a configured key every call is refused.
pub async fn internal_key_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state
        .config
        .security
        .internal_api_key
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized("Internal API key not configured"))?;

    let presented = headers
        .get(INTERNAL_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing internal API key"))?;

    if !keys_match(presented, expected) {
        tracing::warn!("Rejected call with wrong internal API key");
        return Err(ApiError::unauthorized("Invalid internal API key"));
    }

    Ok(next.run(request).await)
}

// Digests have equal length, so the comparison does not leak the key length.
fn keys_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
