//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/sign-up` - Register with email and password
/// - `POST /api/auth/sign-in` - Password sign-in
/// - `GET /api/auth/oauth/:provider/start` - Provider consent URL
/// - `POST /api/auth/oauth/callback` - Complete the OAuth code exchange
/// - `POST /api/auth/verify-email` - Redeem an email-verification token
/// - `POST /api/auth/resend-verification` - Send a fresh verification token
/// - `POST /api/auth/change-password` - Rotate the password credential
/// - `GET /api/me` - Current user and session
/// - `POST /api/auth/sign-out` - Revoke the presented session
/// - `POST /api/auth/sign-out-all` - Revoke every other session
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/sign-up", post(handlers::sign_up_handler))
        .route("/api/auth/sign-in", post(handlers::sign_in_handler))
        .route(
            "/api/auth/oauth/:provider/start",
            get(handlers::oauth_start_handler),
        )
        .route(
            "/api/auth/oauth/callback",
            post(handlers::oauth_callback_handler),
        )
        .route("/api/auth/verify-email", post(handlers::verify_email_handler))
        .route(
            "/api/auth/resend-verification",
            post(handlers::resend_verification_handler),
        )
        .route(
            "/api/auth/change-password",
            post(handlers::change_password_handler),
        )
        .route("/api/me", get(handlers::me_handler))
        .route("/api/auth/sign-out", post(handlers::sign_out_handler))
        .route("/api/auth/sign-out-all", post(handlers::sign_out_all_handler))
}
