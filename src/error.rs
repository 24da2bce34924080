// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::role::Role;

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Every denial serializes to the stable envelope
/// `{"success": false, "message": ..., "code": ...}`. Tokens, secrets and
/// stack traces never appear in a response body.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),
    TokenExpired,
    /// Cookie-bound flow referenced a session that no longer exists.
    /// The pipeline clears the cookie when converting this to a response.
    SessionNotFound,

    // 403 Forbidden
    Forbidden(String),
    /// Well-formed credential with a wrong signature or claim shape.
    InvalidToken,
    InsufficientRole {
        caller: Role,
        required: Vec<Role>,
    },
    CrossTenantDenied {
        caller_school: String,
        requested_schools: Vec<String>,
    },

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::TokenExpired => 401,
            ApiError::SessionNotFound => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::InvalidToken => 403,
            ApiError::InsufficientRole { .. } => 403,
            ApiError::CrossTenantDenied { .. } => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Client-safe error message.
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::TokenExpired => "Token expired".to_string(),
            ApiError::SessionNotFound => "Session not found".to_string(),
            ApiError::Forbidden(msg) => msg.clone(),
            ApiError::InvalidToken => "Invalid token".to_string(),
            ApiError::InsufficientRole { caller, required } => {
                let names: Vec<&str> = required.iter().map(|r| r.as_str()).collect();
                format!(
                    "Role '{}' is not permitted here; requires one of: {}",
                    caller.as_str(),
                    names.join(", ")
                )
            }
            ApiError::CrossTenantDenied {
                caller_school,
                requested_schools,
            } => format!(
                "Access to school(s) {} denied for caller scoped to school '{}'",
                requested_schools.join(", "),
                caller_school
            ),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::InternalServerError(msg) => msg.clone(),
            ApiError::ServiceUnavailable(msg) => msg.clone(),
        }
    }

    /// Machine-readable code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::SessionNotFound => "SESSION_NOT_FOUND",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::InsufficientRole { .. } => "INSUFFICIENT_ROLE",
            ApiError::CrossTenantDenied { .. } => "CROSS_TENANT_DENIED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body.
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::CrossTenantDenied {
                caller_school,
                requested_schools,
            } => json!({
                "success": false,
                "message": self.message(),
                "code": self.error_code(),
                "caller_school": caller_school,
                "requested_schools": requested_schools,
            }),
            ApiError::InsufficientRole { caller, required } => json!({
                "success": false,
                "message": self.message(),
                "code": self.error_code(),
                "caller_role": caller.as_str(),
                "required_roles": required.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
            }),
            _ => json!({
                "success": false,
                "message": self.message(),
                "code": self.error_code(),
            }),
        }
    }
}

// Static constructor methods for the string-carrying variants
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
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

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<crate::auth::token::AuthError> for ApiError {
    fn from(err: crate::auth::token::AuthError) -> Self {
        match err {
            crate::auth::token::AuthError::Expired => ApiError::TokenExpired,
            crate::auth::token::AuthError::Malformed(_) => ApiError::InvalidToken,
            crate::auth::token::AuthError::MissingClaims(field) => {
                ApiError::internal_server_error(format!("Token issuance failed: missing {}", field))
            }
        }
    }
}

impl From<crate::directory::DirectoryError> for ApiError {
    fn from(err: crate::directory::DirectoryError) -> Self {
        tracing::error!("Directory error: {}", err);
        ApiError::internal_server_error("An error occurred while processing your request")
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
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
