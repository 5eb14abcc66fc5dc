// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::services::AuthError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// A domain failure from the identity core, mapped to a stable code.
    Auth(AuthError),
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    InternalServer(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Auth(e) => write!(f, "{}", e),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Status, client-facing message, and stable code for a domain failure.
///
/// InvalidCredentials deliberately covers both "no such user" and "wrong
/// password" with one shape; the distinction only exists in server logs.
fn auth_error_parts(e: &AuthError) -> (StatusCode, String, &'static str) {
    match e {
        AuthError::AccountExists => (
            StatusCode::CONFLICT,
            "an account with this email already exists".to_string(),
            "ACCOUNT_EXISTS",
        ),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "WEAK_PASSWORD"),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "invalid email or password".to_string(),
            "INVALID_CREDENTIALS",
        ),
        AuthError::UntrustedOrigin => (
            StatusCode::FORBIDDEN,
            "origin is not allowed to perform credential exchange".to_string(),
            "UNTRUSTED_ORIGIN",
        ),
        AuthError::TokenNotFound => (
            StatusCode::BAD_REQUEST,
            "verification token not found".to_string(),
            "TOKEN_NOT_FOUND",
        ),
        AuthError::TokenExpired => (
            StatusCode::BAD_REQUEST,
            "verification token has expired".to_string(),
            "TOKEN_EXPIRED",
        ),
        AuthError::TokenAlreadyUsed => (
            StatusCode::BAD_REQUEST,
            "verification token was already used".to_string(),
            "TOKEN_ALREADY_USED",
        ),
        AuthError::SessionNotFound => (
            StatusCode::UNAUTHORIZED,
            "session not found".to_string(),
            "SESSION_NOT_FOUND",
        ),
        AuthError::SessionExpired => (
            StatusCode::UNAUTHORIZED,
            "session has expired".to_string(),
            "SESSION_EXPIRED",
        ),
        AuthError::SessionRevoked => (
            StatusCode::UNAUTHORIZED,
            "session has been revoked".to_string(),
            "SESSION_REVOKED",
        ),
        AuthError::Provider(msg) => {
            warn!(detail = %msg, "OAuth provider handshake failed");
            (
                StatusCode::BAD_GATEWAY,
                "identity provider request failed".to_string(),
                "PROVIDER_ERROR",
            )
        }
        AuthError::StorageUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            "service temporarily unavailable".to_string(),
            "STORAGE_UNAVAILABLE",
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, code) = match self {
            ApiError::Auth(e) => auth_error_parts(&e),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            ApiError::InternalServer(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "INTERNAL_SERVER_ERROR",
            ),
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_shape_is_generic() {
        // Account enumeration resistance: the client-facing message must not
        // say whether the user exists.
        let (status, message, code) = auth_error_parts(&AuthError::InvalidCredentials);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "INVALID_CREDENTIALS");
        assert!(!message.contains("user"));
        assert!(!message.contains("found"));
    }

    #[test]
    fn test_storage_unavailable_does_not_leak_detail() {
        let (status, message, _) = auth_error_parts(&AuthError::StorageUnavailable);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!message.to_lowercase().contains("sql"));
        assert!(!message.to_lowercase().contains("database"));
    }

    #[test]
    fn test_session_failures_map_to_unauthorized() {
        for e in [
            AuthError::SessionNotFound,
            AuthError::SessionExpired,
            AuthError::SessionRevoked,
        ] {
            let (status, _, _) = auth_error_parts(&e);
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }
}
