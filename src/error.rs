// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::{AuthError, TokenError};
use crate::pipeline::PipelineError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (backup endpoint)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        })
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

// Static constructor methods
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

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Store(e) => {
                tracing::error!("Store failure: {}", e);
                ApiError::internal_server_error(e.to_string())
            }
            PipelineError::Validation(_) => ApiError::bad_request(err.to_string()),
            PipelineError::Unauthenticated => ApiError::unauthorized(err.to_string()),
            PipelineError::Denied(_) => ApiError::forbidden(err.to_string()),
            PipelineError::NotFound(msg) => ApiError::not_found(msg),
            PipelineError::Backup(e) => ApiError::bad_gateway(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::UnknownPrincipal(_) => {
                ApiError::unauthorized(AuthError::InvalidCredentials.to_string())
            }
            AuthError::UnknownCapability(_) => ApiError::bad_request(err.to_string()),
            AuthError::Timeout | AuthError::Unavailable(_) => {
                tracing::error!("Authentication provider error: {}", err);
                ApiError::service_unavailable(err.to_string())
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) => ApiError::unauthorized(err.to_string()),
            TokenError::InvalidSecret | TokenError::Generation(_) => {
                tracing::error!("Token error: {}", err);
                ApiError::internal_server_error(err.to_string())
            }
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
        (self.status(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Capability;
    use crate::database::DatabaseError;
    use crate::services::backup::BackupError;

    #[test]
    fn pipeline_failures_map_to_statuses() {
        let cases: Vec<(PipelineError, u16)> = vec![
            (
                PipelineError::Store(DatabaseError::Sqlx(sqlx::Error::RowNotFound)),
                500,
            ),
            (PipelineError::validation("missing name"), 400),
            (PipelineError::Unauthenticated, 401),
            (PipelineError::Denied(Capability::Create), 403),
            (PipelineError::NotFound("There is no page with ID 3".to_string()), 404),
            (
                PipelineError::Backup(BackupError::Transport("refused".to_string())),
                502,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn envelope_carries_error_message() {
        let body = ApiError::from(PipelineError::Denied(Capability::Delete)).to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing capability 'delete'");
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[test]
    fn store_failure_keeps_cause_message() {
        let err = PipelineError::Store(DatabaseError::Sqlx(sqlx::Error::Protocol("disk full".to_string())));
        let api = ApiError::from(err);
        assert!(api.message().contains("disk full"));
    }
}
