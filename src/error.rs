// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::TokenError;
use crate::backend::BackendError;
use crate::filter::FilterError;
use crate::session::SessionError;

/// HTTP API error with a status code and a client-safe message
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });
        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            body["field_errors"] = json!(field_errors);
        }
        body
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError { message: message.into(), field_errors }
    }

    /// Single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), message.clone());
        ApiError::validation_error(message, Some(field_errors))
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
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

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            BackendError::SessionNotFound => ApiError::unauthorized(err.to_string()),
            BackendError::Token(TokenError::Invalid(_)) => ApiError::unauthorized("Invalid or expired session"),
            BackendError::AlreadyRegistered => ApiError::conflict(err.to_string()),
            BackendError::Conflict(msg) => ApiError::conflict(msg),
            BackendError::InvalidRow(msg) => ApiError::bad_request(msg),
            BackendError::Filter(e) => e.into(),
            BackendError::Sqlx(sqlx::Error::PoolTimedOut) | BackendError::Sqlx(sqlx::Error::PoolClosed) => {
                tracing::error!("Database pool unavailable");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            BackendError::Migrate(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            other => {
                // Don't expose storage errors to clients
                tracing::error!("Backend error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::PermissionDenied(msg) => ApiError::forbidden(msg),
            SessionError::Backend { notice, source } => {
                let status = ApiError::from(source);
                match status {
                    ApiError::InternalServerError(_) => status,
                    ApiError::ServiceUnavailable(_) => status,
                    ApiError::Unauthorized(_) => ApiError::unauthorized(notice),
                    ApiError::Conflict(_) => ApiError::conflict(notice),
                    _ => ApiError::bad_request(notice),
                }
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut field_errors = HashMap::new();
        for (field, problems) in errors.field_errors() {
            if let Some(problem) = problems.first() {
                let message = problem
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                field_errors.insert(field.to_string(), message);
            }
        }
        let message = if field_errors.len() == 1 {
            field_errors.values().next().cloned().unwrap_or_default()
        } else {
            "Please correct the highlighted fields".to_string()
        };
        ApiError::validation_error(message, Some(field_errors))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {}", err);
        ApiError::internal_server_error("Failed to format response")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
        name: String,
    }

    #[test]
    fn backend_errors_keep_user_facing_wording() {
        let err: ApiError = BackendError::InvalidCredentials.into();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.message(), "Invalid login credentials");

        let err: ApiError = BackendError::Conflict("duplicate id".into()).into();
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn internal_errors_are_masked() {
        let err: ApiError = BackendError::PasswordHash("salt".into()).into();
        assert_eq!(err.status_code(), 500);
        assert!(!err.message().contains("salt"));
    }

    #[test]
    fn permission_denied_is_forbidden() {
        let err: ApiError = SessionError::PermissionDenied("nope".into()).into();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.to_json()["code"], "FORBIDDEN");
    }

    #[test]
    fn validation_errors_name_the_field() {
        let errors = Form { name: "A".into() }.validate().unwrap_err();
        let err: ApiError = errors.into();
        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "Name must be at least 2 characters");
        assert_eq!(body["field_errors"]["name"], "Name must be at least 2 characters");
    }
}
