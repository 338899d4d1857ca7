use axum::Extension;

use crate::access::Identity;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/auth/whoami - Resolved identity of the caller
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "principal": { "id": "...", "email": "agent@example.com" },
///     "is_superadmin": false,
///     "accessible": { "kind": "only", "customer_ids": ["..."] },
///     "org_scope": null,
///     "roles": { "<customer id>": "admin" }
///   }
/// }
/// ```
pub async fn whoami(Extension(identity): Extension<Identity>) -> ApiResult<Identity> {
    Ok(ApiResponse::success(identity))
}
