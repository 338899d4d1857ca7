pub mod auth;
pub mod extract;
pub mod identity;
pub mod internal_key;
pub mod response;

pub use auth::jwt_auth_middleware;
pub use extract::{Json, Query};
pub use identity::resolve_identity_middleware;
pub use internal_key::{internal_key_middleware, INTERNAL_KEY_HEADER};
pub use response::{ApiResponse, ApiResult};
