//! Request payloads for the auth endpoints
//!
//! Responses are assembled ad hoc with `serde_json::json!` in the handlers;
//! only the inbound shapes get named types.

use serde::Deserialize;

/// POST /api/auth/sign-up
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// POST /api/auth/sign-in
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/oauth/callback
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackRequest {
    pub provider: String,
    pub code: String,
}

/// POST /api/auth/verify-email
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// POST /api/auth/change-password
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}
