//! Session extractor for Axum
//!
//! Resolves the bearer token to its user through the identity core. The
//! lookup extends the session's sliding window, so any authenticated
//! request counts as activity.

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;
use tracing::warn;

use crate::common::{ApiError, AppState};
use crate::store::{SessionRecord, UserRecord};

/// The authenticated caller: the session row plus its user.
#[derive(Debug)]
pub struct CurrentSession {
    pub user: UserRecord,
    pub session: SessionRecord,
}

/// Pull the bearer token out of the Authorization header. Accepts both
/// "Bearer <token>" and a raw token.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let token = match bearer_token(&parts.headers) {
            Some(t) => t,
            None => {
                warn!("Authentication failed: missing session token");
                return Err(ApiError::Unauthorized("missing session token".to_string()));
            }
        };

        let (user, session) = app_state.identity.session_check(token).await?;

        Ok(CurrentSession { user, session })
    }
}
