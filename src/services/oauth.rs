// src/services/oauth.rs
//! OAuth link manager
//!
//! Completes the provider handshake (auth code -> access token -> profile)
//! and maps the provider identity onto a local user. Handshake failures are
//! `Provider` errors, propagated without retry: the front-end restarts the
//! flow, the server never replays an auth code.
//!
//! Linking policy:
//! - known (provider, subject) pair -> its linked user
//! - profile email matches a *verified* local user -> link to that user
//! - profile email matches an *unverified* local user -> refuse to link
//!   (spoofable profile email must not take over an unproven account);
//!   the email is still held by that account, so the sign-in fails with
//!   `AccountExists` unless `link_unverified` is enabled
//! - otherwise -> fresh user, email trusted as the provider reports it

use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::AuthError;
use crate::common::config::OAuthProviderConfig;
use crate::common::helpers::{normalize_email, safe_email_log};
use crate::common::id_generator::generate_user_id;
use crate::store::{AuthStore, OAuthAccountRecord, StoreError, UserRecord};

/// Profile fields extracted from the provider's userinfo response.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    /// Whether the provider vouches for the email. Assumed true when the
    /// provider does not report the field.
    pub email_verified: bool,
}

#[derive(Clone)]
pub struct OAuthService {
    store: Arc<dyn AuthStore>,
    http: Client,
    providers: HashMap<String, OAuthProviderConfig>,
    link_unverified: bool,
}

impl OAuthService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        http: Client,
        providers: Vec<OAuthProviderConfig>,
        link_unverified: bool,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Self {
            store,
            http,
            providers,
            link_unverified,
        }
    }

    fn provider(&self, name: &str) -> Result<&OAuthProviderConfig, AuthError> {
        self.providers
            .get(name)
            .ok_or_else(|| AuthError::Provider(format!("unknown provider '{}'", name)))
    }

    /// Build the provider consent URL the front-end redirects to.
    pub fn authorize_url(&self, provider: &str, state: &str) -> Result<String, AuthError> {
        let cfg = self.provider(provider)?;
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            cfg.authorize_url,
            urlencoding::encode(&cfg.client_id),
            urlencoding::encode(&cfg.redirect_uri),
            urlencoding::encode(&cfg.scopes),
            urlencoding::encode(state),
        ))
    }

    /// Full callback handling: handshake with the provider, then map the
    /// profile onto a local user.
    pub async fn complete_callback(
        &self,
        provider: &str,
        code: &str,
    ) -> Result<UserRecord, AuthError> {
        let cfg = self.provider(provider)?.clone();
        let access_token = self.exchange_code(&cfg, code).await?;
        let profile = self.fetch_profile(&cfg, &access_token).await?;

        info!(
            provider = %provider,
            subject = %profile.subject,
            email = %safe_email_log(&profile.email),
            "OAuth handshake completed"
        );

        self.link_profile(provider, &profile).await
    }

    /// Exchange the authorization code for an access token.
    async fn exchange_code(
        &self,
        cfg: &OAuthProviderConfig,
        code: &str,
    ) -> Result<String, AuthError> {
        let params = [
            ("client_id", cfg.client_id.as_str()),
            ("client_secret", cfg.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", cfg.redirect_uri.as_str()),
        ];

        let resp = self
            .http
            .post(&cfg.token_url)
            // GitHub answers with form-encoding unless JSON is requested.
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, provider = %cfg.name, "Token endpoint unreachable");
                AuthError::Provider("token exchange failed".to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(
                http_status = %status,
                provider = %cfg.name,
                "Token endpoint rejected the authorization code"
            );
            return Err(AuthError::Provider(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| {
            warn!(error = %e, provider = %cfg.name, "Malformed token endpoint response");
            AuthError::Provider("malformed token response".to_string())
        })?;

        body.get("access_token")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| AuthError::Provider("token response missing access_token".to_string()))
    }

    /// Fetch and normalize the userinfo profile.
    async fn fetch_profile(
        &self,
        cfg: &OAuthProviderConfig,
        access_token: &str,
    ) -> Result<ProviderProfile, AuthError> {
        let resp = self
            .http
            .get(&cfg.userinfo_url)
            .bearer_auth(access_token)
            // GitHub rejects requests without a User-Agent.
            .header(reqwest::header::USER_AGENT, "identity-api")
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, provider = %cfg.name, "Userinfo endpoint unreachable");
                AuthError::Provider("profile fetch failed".to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(http_status = %status, provider = %cfg.name, "Userinfo request failed");
            return Err(AuthError::Provider(format!(
                "userinfo endpoint returned {}",
                status
            )));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| {
            warn!(error = %e, provider = %cfg.name, "Malformed userinfo response");
            AuthError::Provider("malformed userinfo response".to_string())
        })?;

        // OpenID Connect calls it "sub"; GitHub calls it "id" and may
        // report it as a number.
        let subject = body
            .get("sub")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| body.get("id").and_then(|v| v.as_str()).map(str::to_string))
            .or_else(|| body.get("id").and_then(|v| v.as_i64()).map(|n| n.to_string()))
            .ok_or_else(|| AuthError::Provider("profile missing subject id".to_string()))?;

        let email = body
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| AuthError::Provider("profile missing email".to_string()))?;

        let name = body
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let email_verified = body
            .get("email_verified")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        Ok(ProviderProfile {
            subject,
            email,
            name,
            email_verified,
        })
    }

    /// Map a provider profile onto a local user per the linking policy.
    pub async fn link_profile(
        &self,
        provider: &str,
        profile: &ProviderProfile,
    ) -> Result<UserRecord, AuthError> {
        // Known provider identity: return its user.
        if let Some(account) = self
            .store
            .get_oauth_account(provider, &profile.subject)
            .await
            .map_err(AuthError::storage)?
        {
            return self.user_for_account(&account).await;
        }

        let email = normalize_email(&profile.email);
        let existing = self
            .store
            .get_user_by_email(&email)
            .await
            .map_err(AuthError::storage)?;

        if let Some(user) = existing {
            let may_link = (user.email_verified && profile.email_verified) || self.link_unverified;
            if may_link {
                return self.link_to_user(provider, profile, user).await;
            }

            // The address belongs to an account that never proved control
            // of it (or the provider itself does not vouch for it). Linking
            // would allow takeover through a spoofed profile email, and the
            // email-uniqueness invariant leaves no room for a second
            // account, so the sign-in fails outright.
            warn!(
                provider = %provider,
                email = %safe_email_log(&email),
                local_verified = user.email_verified,
                profile_verified = profile.email_verified,
                "Refusing to link OAuth identity to unverified account"
            );
            return Err(AuthError::AccountExists);
        }

        self.create_user_for_profile(provider, profile, &email).await
    }

    async fn user_for_account(
        &self,
        account: &OAuthAccountRecord,
    ) -> Result<UserRecord, AuthError> {
        self.store
            .get_user_by_id(&account.user_id)
            .await
            .map_err(AuthError::storage)?
            .ok_or_else(|| {
                warn!(
                    provider = %account.provider,
                    user_id = %account.user_id,
                    "OAuth account points at a missing user"
                );
                AuthError::StorageUnavailable
            })
    }

    async fn link_to_user(
        &self,
        provider: &str,
        profile: &ProviderProfile,
        user: UserRecord,
    ) -> Result<UserRecord, AuthError> {
        let account = OAuthAccountRecord {
            provider: provider.to_string(),
            provider_subject_id: profile.subject.clone(),
            user_id: user.id.clone(),
            linked_at: Utc::now(),
        };

        match self.store.create_oauth_account(&account).await {
            Ok(()) => {
                info!(
                    provider = %provider,
                    user_id = %user.id,
                    "Linked OAuth identity to existing user"
                );
                Ok(user)
            }
            // Concurrent callback linked the same subject first; defer to it.
            Err(StoreError::Conflict(_)) => {
                let account = self
                    .store
                    .get_oauth_account(provider, &profile.subject)
                    .await
                    .map_err(AuthError::storage)?
                    .ok_or(AuthError::StorageUnavailable)?;
                self.user_for_account(&account).await
            }
            Err(e) => Err(AuthError::storage(e)),
        }
    }

    async fn create_user_for_profile(
        &self,
        provider: &str,
        profile: &ProviderProfile,
        email: &str,
    ) -> Result<UserRecord, AuthError> {
        let display_name = profile
            .name
            .clone()
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());

        let user = UserRecord {
            id: generate_user_id(),
            email: email.to_string(),
            display_name,
            email_verified: profile.email_verified,
            created_at: Utc::now(),
        };

        self.store.create_user(&user).await.map_err(|e| match e {
            // A registration for the same email won a race with us.
            StoreError::Conflict(_) => AuthError::AccountExists,
            other => AuthError::storage(other),
        })?;

        info!(
            provider = %provider,
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            "Created new user from OAuth profile"
        );

        self.link_to_user(provider, profile, user).await
    }
}
