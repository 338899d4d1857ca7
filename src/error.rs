// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::access::AccessError;
use crate::database::DatabaseError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request with a machine-stable reason
    BadRequest {
        code: &'static str,
        message: String,
        details: Option<Value>,
    },
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict {
        code: &'static str,
        message: String,
    },

    // 500 Internal Server Error
    InternalServerError {
        message: String,
        details: Option<Value>,
    },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest { message, .. } => message,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict { message, .. } => message,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } => code,
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict { code, .. } => code,
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });

        match self {
            ApiError::ValidationError {
                field_errors: Some(field_errors),
                ..
            } => {
                response["field_errors"] = json!(field_errors);
            }
            ApiError::BadRequest {
                details: Some(details),
                ..
            }
            | ApiError::InternalServerError {
                details: Some(details),
                ..
            } => {
                response["details"] = details.clone();
            }
            _ => {}
        }

        response
    }
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request_with(code: &'static str, message: impl Into<String>, details: Value) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Single-field validation failure
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), message.clone());
        ApiError::validation_error(message, Some(field_errors))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            details: None,
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        // Real cause is logged, never returned
        tracing::error!("Store error: {}", err);
        match err {
            DatabaseError::ConfigMissing(_) | DatabaseError::Migration(_) => {
                ApiError::service_unavailable("Service temporarily unavailable")
            }
            _ => ApiError::internal_server_error("An error occurred while processing your request"),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        let message = err.to_string();
        match err {
            AccessError::Unauthenticated => ApiError::unauthorized(message),
            AccessError::Forbidden(_) => ApiError::forbidden(message),
            AccessError::NotFound(_) => ApiError::not_found(message),
            AccessError::Validation { field, .. } => ApiError::field(field, message),
            AccessError::UnknownAction(action) => {
                ApiError::bad_request_with("UNKNOWN_ACTION", message, json!({ "action": action }))
            }
            AccessError::CannotChangeOwner => ApiError::bad_request("CANNOT_CHANGE_OWNER", message),
            AccessError::CannotRemoveOwner => ApiError::bad_request("CANNOT_REMOVE_OWNER", message),
            AccessError::CannotGrantOwner => ApiError::bad_request("CANNOT_GRANT_OWNER", message),
            AccessError::CannotRemoveSelf => ApiError::bad_request("CANNOT_REMOVE_SELF", message),
            AccessError::PlanLimitExceeded { limit, current } => ApiError::bad_request_with(
                "PLAN_LIMIT_EXCEEDED",
                message,
                json!({ "limit": limit, "current": current }),
            ),
            AccessError::DuplicateInvite => ApiError::bad_request("DUPLICATE_INVITE", message),
            AccessError::AlreadyHasAccess => ApiError::bad_request("ALREADY_HAS_ACCESS", message),
            AccessError::TeamHasMembers { count } => ApiError::bad_request_with(
                "TEAM_HAS_MEMBERS",
                message,
                json!({ "member_count": count }),
            ),
            AccessError::DuplicateTeamName => ApiError::conflict("DUPLICATE_TEAM_NAME", message),
            AccessError::AssignmentIncomplete {
                assignment_saved,
                audit_saved,
            } => ApiError::InternalServerError {
                message,
                details: Some(json!({
                    "assignment_saved": assignment_saved,
                    "audit_saved": audit_saved,
                })),
            },
            AccessError::Store(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_limit_carries_numbers() {
        let err = ApiError::from(AccessError::PlanLimitExceeded { limit: 3, current: 3 });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = err.to_json();
        assert_eq!(body["code"], "PLAN_LIMIT_EXCEEDED");
        assert_eq!(body["details"]["limit"], 3);
        assert!(body["message"].as_str().unwrap().contains('3'));
    }

    #[test]
    fn duplicate_team_name_is_a_conflict() {
        let err = ApiError::from(AccessError::DuplicateTeamName);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "DUPLICATE_TEAM_NAME");
    }

    #[test]
    fn store_errors_hide_their_cause() {
        let err = ApiError::from(AccessError::Store(DatabaseError::QueryError("relation missing".into())));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("relation"));
    }

    #[test]
    fn validation_reports_field() {
        let body = ApiError::from(AccessError::validation("email", "A valid email is required")).to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["email"], "A valid email is required");
    }
}
