// src/services/identity.rs
//! Facade over the auth services.
//!
//! Every state-changing operation passes the origin gate before anything
//! else runs: an untrusted caller never reaches the credential store, the
//! token table, or a provider. Handlers stay thin and call in here.

use std::sync::Arc;
use tracing::{info, warn};

use super::credentials::CredentialService;
use super::oauth::OAuthService;
use super::origins::TrustedOrigins;
use super::sessions::{ClientMetadata, SessionService};
use super::tokens::{VerificationTokenService, PURPOSE_VERIFY_EMAIL};
use super::AuthError;
use crate::store::{with_retry, AuthStore, SessionRecord, UserRecord};

#[derive(Clone)]
pub struct IdentityService {
    origins: TrustedOrigins,
    credentials: CredentialService,
    tokens: VerificationTokenService,
    oauth: OAuthService,
    sessions: SessionService,
    store: Arc<dyn AuthStore>,
}

impl IdentityService {
    pub fn new(
        origins: TrustedOrigins,
        credentials: CredentialService,
        tokens: VerificationTokenService,
        oauth: OAuthService,
        sessions: SessionService,
        store: Arc<dyn AuthStore>,
    ) -> Self {
        Self {
            origins,
            credentials,
            tokens,
            oauth,
            sessions,
            store,
        }
    }

    /// Register with email and password, then open a session.
    ///
    /// The new session exists in the pending state: the user is signed in
    /// but `email_verified` stays false until the emailed token is redeemed.
    pub async fn sign_up(
        &self,
        origin: Option<&str>,
        email: &str,
        display_name: &str,
        password: &str,
        client: ClientMetadata,
    ) -> Result<(UserRecord, SessionRecord), AuthError> {
        self.origins.require_trusted(origin)?;
        let user = self.credentials.register(email, display_name, password).await?;
        let session = self.sessions.issue(&user.id, client).await?;
        Ok((user, session))
    }

    /// Password sign-in, opening a fresh session on success.
    pub async fn sign_in(
        &self,
        origin: Option<&str>,
        email: &str,
        password: &str,
        client: ClientMetadata,
    ) -> Result<(UserRecord, SessionRecord), AuthError> {
        self.origins.require_trusted(origin)?;
        let user = self.credentials.authenticate(email, password).await?;
        let session = self.sessions.issue(&user.id, client).await?;
        Ok((user, session))
    }

    /// Build the provider consent URL for the front-end to redirect to.
    pub fn oauth_authorize_url(
        &self,
        origin: Option<&str>,
        provider: &str,
        state: &str,
    ) -> Result<String, AuthError> {
        self.origins.require_trusted(origin)?;
        self.oauth.authorize_url(provider, state)
    }

    /// Complete an OAuth callback: handshake, map the profile onto a user,
    /// open a session.
    pub async fn oauth_sign_in(
        &self,
        origin: Option<&str>,
        provider: &str,
        code: &str,
        client: ClientMetadata,
    ) -> Result<(UserRecord, SessionRecord), AuthError> {
        self.origins.require_trusted(origin)?;
        let user = self.oauth.complete_callback(provider, code).await?;
        let session = self.sessions.issue(&user.id, client).await?;
        Ok((user, session))
    }

    /// Resolve a session handle to its user, extending the sliding window.
    pub async fn session_check(
        &self,
        token: &str,
    ) -> Result<(UserRecord, SessionRecord), AuthError> {
        let session = self.sessions.validate(token).await?;

        let user = with_retry("get_user_by_id", || {
            self.store.get_user_by_id(&session.user_id)
        })
        .await
        .map_err(AuthError::storage)?;

        match user {
            Some(user) => Ok((user, session)),
            None => {
                // Deleted users cascade their sessions away, so a live
                // session without a user means the delete raced us.
                warn!(user_id = %session.user_id, "Session resolved to a deleted user");
                Err(AuthError::SessionNotFound)
            }
        }
    }

    /// Sign out of one session. Idempotent, and deliberately not behind the
    /// origin gate: revoking a session only ever destroys the caller's own
    /// access, so the acknowledgement must not fail on a missing Origin.
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.revoke(token).await
    }

    /// Sign out everywhere except the calling session. Returns the count of
    /// sessions revoked.
    pub async fn sign_out_all(
        &self,
        origin: Option<&str>,
        token: &str,
    ) -> Result<u64, AuthError> {
        self.origins.require_trusted(origin)?;
        let (_, session) = self.session_check(token).await?;
        self.sessions
            .revoke_all(&session.user_id, Some(&session.token))
            .await
    }

    /// Issue a fresh verification token for the calling session's user and
    /// send it. A no-op for already-verified users.
    pub async fn resend_verification(
        &self,
        origin: Option<&str>,
        token: &str,
    ) -> Result<(), AuthError> {
        self.origins.require_trusted(origin)?;
        let (user, _) = self.session_check(token).await?;

        if user.email_verified {
            info!(user_id = %user.id, "Verification resend skipped, email already verified");
            return Ok(());
        }

        self.credentials.send_verification(&user).await?;
        Ok(())
    }

    /// Redeem an email-verification token and mark the user verified.
    pub async fn verify_email(
        &self,
        origin: Option<&str>,
        token: &str,
    ) -> Result<UserRecord, AuthError> {
        self.origins.require_trusted(origin)?;

        let user_id = self.tokens.redeem(token, PURPOSE_VERIFY_EMAIL).await?;

        self.store
            .set_email_verified(&user_id)
            .await
            .map_err(AuthError::storage)?;

        let user = self
            .store
            .get_user_by_id(&user_id)
            .await
            .map_err(AuthError::storage)?
            .ok_or_else(|| {
                // The token redeemed but its user is gone: a delete raced
                // the redemption. Not a token problem, so don't label it one.
                warn!(user_id = %user_id, "Verification token redeemed for a deleted user");
                AuthError::StorageUnavailable
            })?;

        info!(user_id = %user.id, "Email verified");
        Ok(user)
    }

    /// Change the password for the calling session's user. Every other
    /// session of that user is revoked; the caller stays signed in.
    pub async fn change_password(
        &self,
        origin: Option<&str>,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<u64, AuthError> {
        self.origins.require_trusted(origin)?;
        let (user, session) = self.session_check(token).await?;

        self.credentials
            .change_password(&user.id, old_password, new_password)
            .await?;

        self.sessions
            .revoke_all(&user.id, Some(&session.token))
            .await
    }
}
