// src/common/config.rs
//! Process configuration
//!
//! Everything the identity core needs from its environment is read once at
//! startup and never mutated afterwards: trusted origins, session lifetimes,
//! the password policy, and OAuth provider credentials.

use chrono::Duration;
use std::collections::HashSet;
use std::env;
use tracing::warn;

/// Default sliding-window session TTL: 7 days.
const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Default absolute session lifetime cap: 30 days.
const DEFAULT_SESSION_MAX_LIFETIME_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Default verification token TTL: 24 hours.
const DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Default minimum password length.
const DEFAULT_PASSWORD_MIN_LENGTH: usize = 8;

/// Password strength policy, supplied to the credential store.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    /// Require at least two character classes (letters / digits / other).
    pub require_mixed_classes: bool,
}

/// Credentials and endpoints for one upstream OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: String,
    pub redirect_uri: String,
}

/// Immutable process configuration for the identity core.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Exact scheme+host+port origins allowed to perform credential exchange.
    pub trusted_origins: HashSet<String>,
    pub session_ttl: Duration,
    pub session_max_lifetime: Duration,
    pub verification_token_ttl: Duration,
    pub password_policy: PasswordPolicy,
    /// Link an OAuth profile email to an existing *unverified* local account.
    /// Off by default: a spoofed profile email must not take over an account
    /// whose owner never proved control of that address.
    pub oauth_link_unverified: bool,
    pub oauth_providers: Vec<OAuthProviderConfig>,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let trusted_origins: HashSet<String> = env::var("TRUSTED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let session_ttl = Duration::seconds(env_i64(
            "SESSION_TTL_SECONDS",
            DEFAULT_SESSION_TTL_SECONDS,
        ));
        let session_max_lifetime = Duration::seconds(env_i64(
            "SESSION_MAX_LIFETIME_SECONDS",
            DEFAULT_SESSION_MAX_LIFETIME_SECONDS,
        ));
        let verification_token_ttl = Duration::seconds(env_i64(
            "VERIFICATION_TOKEN_TTL_SECONDS",
            DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS,
        ));

        let min_length = env::var("PASSWORD_MIN_LENGTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_PASSWORD_MIN_LENGTH);

        let require_mixed_classes = env_bool("PASSWORD_REQUIRE_MIXED_CLASSES", true);
        let oauth_link_unverified = env_bool("OAUTH_LINK_UNVERIFIED", false);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let mut oauth_providers = Vec::new();
        if let Some(google) = google_provider_from_env(&base_url) {
            oauth_providers.push(google);
        }
        if let Some(github) = github_provider_from_env(&base_url) {
            oauth_providers.push(github);
        }

        Self {
            trusted_origins,
            session_ttl,
            session_max_lifetime,
            verification_token_ttl,
            password_policy: PasswordPolicy {
                min_length,
                require_mixed_classes,
            },
            oauth_link_unverified,
            oauth_providers,
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(v) if v > 0 => v,
            _ => {
                warn!(key = %key, value = %raw, "Invalid duration value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(default)
}

fn google_provider_from_env(base_url: &str) -> Option<OAuthProviderConfig> {
    let client_id = env::var("OAUTH_GOOGLE_CLIENT_ID").ok()?;
    let client_secret = env::var("OAUTH_GOOGLE_CLIENT_SECRET").ok()?;

    Some(OAuthProviderConfig {
        name: "google".to_string(),
        client_id,
        client_secret,
        authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
        token_url: "https://oauth2.googleapis.com/token".to_string(),
        userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        scopes: "openid email profile".to_string(),
        redirect_uri: format!("{}/api/auth/oauth/callback", base_url),
    })
}

fn github_provider_from_env(base_url: &str) -> Option<OAuthProviderConfig> {
    let client_id = env::var("OAUTH_GITHUB_CLIENT_ID").ok()?;
    let client_secret = env::var("OAUTH_GITHUB_CLIENT_SECRET").ok()?;

    Some(OAuthProviderConfig {
        name: "github".to_string(),
        client_id,
        client_secret,
        authorize_url: "https://github.com/login/oauth/authorize".to_string(),
        token_url: "https://github.com/login/oauth/access_token".to_string(),
        userinfo_url: "https://api.github.com/user".to_string(),
        scopes: "read:user user:email".to_string(),
        redirect_uri: format!("{}/api/auth/oauth/callback", base_url),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_bool_default() {
        // Key that no test environment sets
        assert!(env_bool("IDENTITY_API_TEST_MISSING_BOOL", true));
        assert!(!env_bool("IDENTITY_API_TEST_MISSING_BOOL", false));
    }

    #[test]
    fn test_default_config_has_local_origins() {
        let config = AuthConfig::from_env();
        assert!(config.trusted_origins.contains("http://localhost:3000"));
        assert!(config.session_ttl < config.session_max_lifetime);
        assert_eq!(config.password_policy.min_length, DEFAULT_PASSWORD_MIN_LENGTH);
    }
}
