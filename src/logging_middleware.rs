// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode
//!
//! Bodies on credential-bearing paths are never logged, whatever the log
//! level: those requests carry raw passwords and the responses carry
//! session tokens. For them only method, path, and status are recorded.

use axum::body::to_bytes;
use axum::{
    body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response,
};
use tracing::debug;

/// Paths whose bodies must stay out of the logs.
const REDACTED_PATHS: &[&str] = &[
    "/api/auth/sign-up",
    "/api/auth/sign-in",
    "/api/auth/oauth/callback",
    "/api/auth/change-password",
];

fn is_redacted(path: &str) -> bool {
    REDACTED_PATHS.contains(&path)
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let path = request.uri().path().to_string();

    if is_redacted(&path) {
        let method = request.method().clone();
        let response = next.run(request).await;
        debug!(
            method = %method,
            path = %path,
            status = %response.status(),
            "📥 Request (body redacted)"
        );
        return Ok(response);
    }

    let (parts, body) = request.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Ok(body_str) = std::str::from_utf8(&bytes) {
            debug!(
                method = %parts.method,
                uri = %parts.uri,
                request_body = %body_str,
                "📥 Request"
            );
        }
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Ok(body_str) = std::str::from_utf8(&bytes) {
            debug!(
                status = %parts.status,
                response_body = %body_str,
                "📤 Response"
            );
        }
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_paths_are_redacted() {
        assert!(is_redacted("/api/auth/sign-in"));
        assert!(is_redacted("/api/auth/sign-up"));
        assert!(is_redacted("/api/auth/change-password"));
        assert!(!is_redacted("/api/me"));
        assert!(!is_redacted("/api/auth/verify-email"));
    }
}
