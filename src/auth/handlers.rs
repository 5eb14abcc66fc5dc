//! Authentication handlers
//!
//! Thin adapters between HTTP and the identity core: pull the origin and
//! client metadata off the request, call one facade operation, shape the
//! JSON response. No auth decisions are made here.

use axum::extract::{Extension, Json, Path, Query};
use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::extractors::{bearer_token, CurrentSession};
use super::models::{
    ChangePasswordRequest, OAuthCallbackRequest, SignInRequest, SignUpRequest, VerifyEmailRequest,
};
use crate::common::helpers::is_valid_email;
use crate::common::{safe_email_log, ApiError, AppState};
use crate::services::ClientMetadata;
use crate::store::{SessionRecord, UserRecord};

fn request_origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
}

fn client_metadata(headers: &HeaderMap) -> ClientMetadata {
    ClientMetadata {
        origin: request_origin(headers).map(str::to_string),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

fn session_response(user: &UserRecord, session: &SessionRecord) -> serde_json::Value {
    serde_json::json!({
        "token": session.token,
        "expires_at": session.expires_at,
        "user": user,
    })
}

/// POST /api/auth/sign-up
///
/// Registers a user and opens a session in the pending state: signed in,
/// `email_verified` false until the emailed token is redeemed.
pub async fn sign_up_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!(email = %safe_email_log(&payload.email), "Received sign-up request");

    if !is_valid_email(&payload.email) {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }

    let (user, session) = state
        .identity
        .sign_up(
            request_origin(&headers),
            &payload.email,
            &payload.name,
            &payload.password,
            client_metadata(&headers),
        )
        .await?;

    Ok(Json(session_response(&user, &session)))
}

/// POST /api/auth/sign-in
pub async fn sign_in_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!(email = %safe_email_log(&payload.email), "Received sign-in request");

    let (user, session) = state
        .identity
        .sign_in(
            request_origin(&headers),
            &payload.email,
            &payload.password,
            client_metadata(&headers),
        )
        .await?;

    Ok(Json(session_response(&user, &session)))
}

/// GET /api/auth/oauth/:provider/start
///
/// Hands the front-end the provider consent URL; the optional `state`
/// query parameter is passed through for CSRF binding on the client side.
pub async fn oauth_start_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(provider): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let csrf_state = params.get("state").map(String::as_str).unwrap_or("");

    let url = state
        .identity
        .oauth_authorize_url(request_origin(&headers), &provider, csrf_state)?;

    Ok(Json(serde_json::json!({ "authorize_url": url })))
}

/// POST /api/auth/oauth/callback
///
/// Completes the code exchange with the provider and signs the mapped
/// user in.
pub async fn oauth_callback_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<OAuthCallbackRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!(provider = %payload.provider, "Received OAuth callback");

    let (user, session) = state
        .identity
        .oauth_sign_in(
            request_origin(&headers),
            &payload.provider,
            &payload.code,
            client_metadata(&headers),
        )
        .await?;

    Ok(Json(session_response(&user, &session)))
}

/// POST /api/auth/resend-verification
///
/// Issues and sends a fresh verification token for the calling user.
/// Responds 200 even when the email is already verified.
pub async fn resend_verification_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    current: CurrentSession,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .identity
        .resend_verification(request_origin(&headers), &current.session.token)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Verification email sent" })))
}

/// POST /api/auth/verify-email
pub async fn verify_email_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state
        .identity
        .verify_email(request_origin(&headers), &payload.token)
        .await?;

    Ok(Json(serde_json::json!({ "user": user })))
}

/// POST /api/auth/change-password
///
/// Re-proves the current password, swaps the credential, and signs out
/// every other session of the user. The calling session stays alive.
pub async fn change_password_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    current: CurrentSession,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let revoked = state
        .identity
        .change_password(
            request_origin(&headers),
            &current.session.token,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Password changed",
        "other_sessions_revoked": revoked,
    })))
}

/// GET /api/me
pub async fn me_handler(current: CurrentSession) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(serde_json::json!({
        "user": current.user,
        "session": {
            "expires_at": current.session.expires_at,
            "issued_at": current.session.issued_at,
        },
    })))
}

/// POST /api/auth/sign-out
///
/// Revokes the presented session. Idempotent, so a stale or already
/// revoked token still gets a 200.
pub async fn sign_out_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("missing session token".to_string()))?;

    state.identity.sign_out(token).await?;

    Ok(Json(serde_json::json!({ "message": "Signed out" })))
}

/// POST /api/auth/sign-out-all
///
/// Signs the user out everywhere except the calling session.
pub async fn sign_out_all_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    current: CurrentSession,
) -> Result<Json<serde_json::Value>, ApiError> {
    let revoked = state
        .identity
        .sign_out_all(request_origin(&headers), &current.session.token)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Signed out everywhere",
        "revoked": revoked,
    })))
}
