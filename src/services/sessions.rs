// src/services/sessions.rs
//! Session manager
//!
//! The only component that mints a token callers are allowed to hold. A
//! session moves Active -> Expired (checked lazily at validation) or
//! Active -> Revoked (explicit sign-out); both are terminal.
//!
//! Expiry is a sliding window: every successful validation pushes
//! `expires_at` forward by the TTL, but never past `issued_at` plus the
//! absolute lifetime cap, so an actively used session still ends eventually.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::AuthError;
use crate::common::helpers::safe_token_log;
use crate::common::id_generator::generate_session_token;
use crate::store::{with_retry, AuthStore, SessionRecord};

/// Client-declared metadata recorded with each session for audit.
#[derive(Debug, Clone, Default)]
pub struct ClientMetadata {
    pub origin: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn AuthStore>,
    ttl: Duration,
    max_lifetime: Duration,
}

impl SessionService {
    pub fn new(store: Arc<dyn AuthStore>, ttl: Duration, max_lifetime: Duration) -> Self {
        Self {
            store,
            ttl,
            max_lifetime,
        }
    }

    fn bounded_expiry(&self, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        let slid = now + self.ttl;
        let cap = issued_at + self.max_lifetime;
        slid.min(cap)
    }

    /// Mint a session for an authenticated user.
    ///
    /// Concurrent sign-ins for the same user are independent sessions;
    /// multi-device use is expected, not an error.
    pub async fn issue(
        &self,
        user_id: &str,
        client: ClientMetadata,
    ) -> Result<SessionRecord, AuthError> {
        let now = Utc::now();
        let session = SessionRecord {
            token: generate_session_token(),
            user_id: user_id.to_string(),
            issued_at: now,
            expires_at: self.bounded_expiry(now, now),
            revoked: false,
            client_origin: client.origin,
            user_agent: client.user_agent,
        };

        self.store
            .create_session(&session)
            .await
            .map_err(AuthError::storage)?;

        info!(
            user_id = %user_id,
            token = %safe_token_log(&session.token),
            expires_at = %session.expires_at,
            "Session issued"
        );

        Ok(session)
    }

    /// Validate a presented session handle, extending the sliding window.
    ///
    /// Cheap enough to run on every request. The extension is a single
    /// last-writer-wins row update; concurrent validations both succeed and
    /// whichever write lands last sets the expiry.
    pub async fn validate(&self, token: &str) -> Result<SessionRecord, AuthError> {
        let session = with_retry("get_session", || self.store.get_session(token))
            .await
            .map_err(AuthError::storage)?
            .ok_or(AuthError::SessionNotFound)?;

        if session.revoked {
            debug!(token = %safe_token_log(token), "Rejected revoked session");
            return Err(AuthError::SessionRevoked);
        }

        let now = Utc::now();

        // The absolute cap holds even if repeated use kept the sliding
        // window alive right up to it.
        if now >= session.issued_at + self.max_lifetime || now >= session.expires_at {
            debug!(token = %safe_token_log(token), "Rejected expired session");
            return Err(AuthError::SessionExpired);
        }

        let extended = self.bounded_expiry(session.issued_at, now);
        if let Err(e) = with_retry("touch_session", || {
            self.store.touch_session(token, extended)
        })
        .await
        {
            // The session is proven valid; a failed extension only means the
            // window did not slide this time.
            warn!(error = %e, token = %safe_token_log(token), "Failed to extend session expiry");
        }

        Ok(SessionRecord {
            expires_at: extended,
            ..session
        })
    }

    /// Revoke a session. Idempotent: revoking an already-revoked or unknown
    /// session is fine.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        self.store
            .revoke_session(token)
            .await
            .map_err(AuthError::storage)?;
        info!(token = %safe_token_log(token), "Session revoked");
        Ok(())
    }

    /// Revoke every active session for a user ("sign out everywhere"),
    /// optionally sparing the caller's own session. Returns the count.
    pub async fn revoke_all(
        &self,
        user_id: &str,
        except_token: Option<&str>,
    ) -> Result<u64, AuthError> {
        let count = self
            .store
            .revoke_sessions_for_user(user_id, except_token)
            .await
            .map_err(AuthError::storage)?;
        info!(user_id = %user_id, revoked = count, "Revoked all sessions for user");
        Ok(count)
    }
}
