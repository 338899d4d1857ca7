// Body and query extractors that reject with `ApiError`
use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Request,
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `axum::Json` with malformed bodies reported as 400 `ApiError`s.
pub struct Json<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Json(value))
    }
}

/// `axum::extract::Query` with the same rejection mapping.
pub struct Query<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Query(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => data_error(&err.body_text()),
            JsonRejection::JsonSyntaxError(_) => ApiError::bad_request("INVALID_JSON", "Request body is not valid JSON"),
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::bad_request("UNSUPPORTED_CONTENT_TYPE", "Expected `Content-Type: application/json`")
            }
            other => ApiError::bad_request("INVALID_BODY", other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation_error(detail(&rejection.body_text()), None)
    }
}

fn detail(text: &str) -> &str {
    text.split_once(": ").map(|(_, rest)| rest).unwrap_or(text)
}

/// Turns a deserialization failure into a field-level validation error when
/// the offending field can be named.
fn data_error(text: &str) -> ApiError {
    let detail = detail(text);

    // "<path>: <reason>" for nested failures
    if let Some((path, reason)) = detail.split_once(": ") {
        if !path.is_empty() && !path.contains(char::is_whitespace) {
            return ApiError::field(path, reason);
        }
    }

    // "missing field `name` at line 1 column 2"
    if let Some(name) = detail
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'))
        .map(|(name, _)| name)
    {
        return ApiError::field(name, format!("{} is required", name));
    }

    ApiError::validation_error(detail, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn nested_failure_names_the_field() {
        let err = data_error(
            "Failed to deserialize the JSON body into the target type: sessionId: UUID parsing failed: invalid character",
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"]["sessionId"]
            .as_str()
            .unwrap()
            .starts_with("UUID parsing failed"));
    }

    #[test]
    fn missing_field_is_required() {
        let body = data_error(
            "Failed to deserialize the JSON body into the target type: missing field `action` at line 1 column 2",
        )
        .to_json();
        assert_eq!(body["field_errors"]["action"], "action is required");
    }

    #[test]
    fn unnamed_failure_is_still_a_validation_error() {
        let body = data_error("Failed to deserialize the JSON body into the target type: invalid type: integer `1`")
            .to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body.get("field_errors").is_none());
    }
}
