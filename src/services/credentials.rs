// src/services/credentials.rs
//! Credential store
//!
//! Owns user identity records and password credentials. Registration,
//! password sign-in, and password change all live here; session handling is
//! the session manager's job and origin checks happen before any of this
//! code runs.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::email::deliver_verification_email;
use super::password::{hash_password, validate_password, verify_password, verify_dummy, HASH_VERSION};
use super::tokens::{VerificationTokenService, PURPOSE_VERIFY_EMAIL};
use super::AuthError;
use crate::common::config::PasswordPolicy;
use crate::common::helpers::{normalize_email, safe_email_log};
use crate::common::id_generator::generate_user_id;
use crate::store::{
    with_retry, AuthStore, CredentialRecord, StoreError, UserRecord, VerificationTokenRecord,
};

#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn AuthStore>,
    tokens: VerificationTokenService,
    policy: PasswordPolicy,
    verification_token_ttl: chrono::Duration,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        tokens: VerificationTokenService,
        policy: PasswordPolicy,
        verification_token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            store,
            tokens,
            policy,
            verification_token_ttl,
        }
    }

    /// Register a new user with email and password.
    ///
    /// The user row and the credential row are written as one transactional
    /// unit, so an aborted request never leaves a user without a credential.
    /// A "verify-email" token is issued as a side effect; token issue
    /// failures are logged but do not undo the registration (the client can
    /// request a fresh token later).
    pub async fn register(
        &self,
        email: &str,
        display_name: &str,
        raw_password: &str,
    ) -> Result<UserRecord, AuthError> {
        let email = normalize_email(email);
        validate_password(raw_password, &self.policy)?;

        let password_hash = hash_password(raw_password)?;
        let now = Utc::now();

        let user = UserRecord {
            id: generate_user_id(),
            email: email.clone(),
            display_name: display_name.to_string(),
            email_verified: false,
            created_at: now,
        };
        let credential = CredentialRecord {
            user_id: user.id.clone(),
            password_hash,
            hash_version: HASH_VERSION,
            updated_at: now,
        };

        // Uniqueness is decided by the store's constraint, not by a lookup
        // here; a concurrent register for the same email loses cleanly.
        self.store
            .create_user_with_credential(&user, &credential)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::AccountExists,
                other => AuthError::storage(other),
            })?;

        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            "User registered"
        );

        // Token issue failures do not undo the registration; the user can
        // request a fresh token through the resend endpoint.
        if let Err(e) = self.send_verification(&user).await {
            warn!(
                error = %e,
                user_id = %user.id,
                "Failed to issue verification token at registration"
            );
        }

        Ok(user)
    }

    /// Issue a fresh verification token for the user and hand it to the
    /// mail path. Used at registration and by the resend endpoint.
    pub async fn send_verification(
        &self,
        user: &UserRecord,
    ) -> Result<VerificationTokenRecord, AuthError> {
        let token = self
            .tokens
            .issue(&user.id, PURPOSE_VERIFY_EMAIL, self.verification_token_ttl)
            .await?;
        deliver_verification_email(&user.email, &user.display_name, &token.token);
        Ok(token)
    }

    /// Authenticate with email and password.
    ///
    /// Unknown user, missing credential, and wrong password all cost about
    /// the same time and all come back as the same `InvalidCredentials`;
    /// only the log knows which one happened.
    pub async fn authenticate(
        &self,
        email: &str,
        raw_password: &str,
    ) -> Result<UserRecord, AuthError> {
        let email = normalize_email(email);

        let user = with_retry("get_user_by_email", || {
            self.store.get_user_by_email(&email)
        })
        .await
        .map_err(AuthError::storage)?;

        let user = match user {
            Some(u) => u,
            None => {
                warn!(email = %safe_email_log(&email), "Sign-in failed: no such user");
                verify_dummy();
                return Err(AuthError::InvalidCredentials);
            }
        };

        let credential = with_retry("get_credential", || self.store.get_credential(&user.id))
            .await
            .map_err(AuthError::storage)?;

        let credential = match credential {
            Some(c) => c,
            None => {
                // OAuth-only account: no password to compare.
                warn!(user_id = %user.id, "Sign-in failed: account has no password credential");
                verify_dummy();
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(raw_password, &credential.password_hash) {
            warn!(user_id = %user.id, "Sign-in failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            "Password sign-in successful"
        );

        Ok(user)
    }

    /// Change the password, re-proving the old one first.
    pub async fn change_password(
        &self,
        user_id: &str,
        old_raw_password: &str,
        new_raw_password: &str,
    ) -> Result<(), AuthError> {
        let credential = with_retry("get_credential", || self.store.get_credential(user_id))
            .await
            .map_err(AuthError::storage)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(old_raw_password, &credential.password_hash) {
            warn!(user_id = %user_id, "Password change failed: old password wrong");
            return Err(AuthError::InvalidCredentials);
        }

        validate_password(new_raw_password, &self.policy)?;
        let password_hash = hash_password(new_raw_password)?;

        self.store
            .update_credential(user_id, &password_hash, HASH_VERSION, Utc::now())
            .await
            .map_err(AuthError::storage)?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}
