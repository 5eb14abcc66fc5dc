// src/services/tests.rs
//
// End-to-end tests for the identity core over the in-memory store. The
// HTTP layer is not involved; these exercise the same operations the
// handlers call.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::oauth::ProviderProfile;
use super::tokens::PURPOSE_VERIFY_EMAIL;
use super::*;
use crate::common::config::PasswordPolicy;
use crate::store::{
    AuthStore, CredentialRecord, MemoryStore, OAuthAccountRecord, SessionRecord, StoreError,
    UserRecord, VerificationTokenRecord,
};

const ORIGIN: &str = "http://localhost:3000";

fn trusted() -> Option<&'static str> {
    Some(ORIGIN)
}

fn client() -> ClientMetadata {
    ClientMetadata {
        origin: Some(ORIGIN.to_string()),
        user_agent: Some("identity-core-tests".to_string()),
    }
}

struct Harness {
    identity: IdentityService,
    tokens: VerificationTokenService,
    credentials: CredentialService,
    oauth: OAuthService,
    store: Arc<dyn AuthStore>,
}

fn harness() -> Harness {
    harness_with(Duration::days(7), Duration::days(30), false)
}

fn harness_with(ttl: Duration, max_lifetime: Duration, link_unverified: bool) -> Harness {
    let store: Arc<dyn AuthStore> = Arc::new(MemoryStore::new());
    harness_on(store, ttl, max_lifetime, link_unverified)
}

fn harness_on(
    store: Arc<dyn AuthStore>,
    ttl: Duration,
    max_lifetime: Duration,
    link_unverified: bool,
) -> Harness {
    let mut origins = HashSet::new();
    origins.insert(ORIGIN.to_string());

    let policy = PasswordPolicy {
        min_length: 8,
        require_mixed_classes: true,
    };

    let tokens = VerificationTokenService::new(store.clone());
    let credentials = CredentialService::new(
        store.clone(),
        tokens.clone(),
        policy,
        Duration::hours(24),
    );
    let oauth = OAuthService::new(
        store.clone(),
        reqwest::Client::new(),
        Vec::new(),
        link_unverified,
    );
    let sessions = SessionService::new(store.clone(), ttl, max_lifetime);
    let identity = IdentityService::new(
        TrustedOrigins::new(origins),
        credentials.clone(),
        tokens.clone(),
        oauth.clone(),
        sessions,
        store.clone(),
    );

    Harness {
        identity,
        tokens,
        credentials,
        oauth,
        store,
    }
}

// ---- registration and password sign-in ----

#[tokio::test]
async fn test_register_then_sign_in_roundtrip() {
    let h = harness();

    let (user, session) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();
    assert_eq!(user.email, "ada@example.com");
    assert!(!user.email_verified);
    assert_eq!(session.user_id, user.id);

    // Email lookup is case- and whitespace-insensitive.
    let (again, second) = h
        .identity
        .sign_in(trusted(), "  ADA@Example.COM ", "correct horse 9", client())
        .await
        .unwrap();
    assert_eq!(again.id, user.id);
    assert_ne!(second.token, session.token);

    let (checked, _) = h.identity.session_check(&second.token).await.unwrap();
    assert_eq!(checked.id, user.id);
}

#[tokio::test]
async fn test_wrong_password_always_invalid_credentials() {
    let h = harness();
    h.identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    for _ in 0..5 {
        let err = h
            .identity
            .sign_in(trusted(), "ada@example.com", "wrong password 1", client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    // No lockout: the right password still works.
    h.identity
        .sign_in(trusted(), "ada@example.com", "correct horse 9", client())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_user_indistinguishable_from_wrong_password() {
    let h = harness();
    let err = h
        .identity
        .sign_in(trusted(), "nobody@example.com", "whatever 123", client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_weak_password_rejected_at_registration() {
    let h = harness();

    let err = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "short1", client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword(_)));

    // Single character class.
    let err = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "aaaaaaaaaa", client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword(_)));

    // The failed attempts left no user behind.
    assert!(h
        .store
        .get_user_by_email("ada@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_concurrent_duplicate_registration_single_winner() {
    let h = harness();

    let a = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client());
    let b = h
        .identity
        .sign_up(trusted(), "Ada@Example.com", "Ada 2", "other horses 42", client());
    let (ra, rb) = tokio::join!(a, b);

    let (oks, errs): (Vec<_>, Vec<_>) = [ra, rb].into_iter().partition(Result::is_ok);
    assert_eq!(oks.len(), 1);
    assert_eq!(errs.len(), 1);
    assert!(matches!(errs[0], Err(AuthError::AccountExists)));

    // The loser left no partial state: exactly one user, with a credential.
    let user = h
        .store
        .get_user_by_email("ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(h.store.get_credential(&user.id).await.unwrap().is_some());
}

// ---- email verification tokens ----

#[tokio::test]
async fn test_verify_email_flow() {
    let h = harness();
    let (user, session) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();
    assert!(!user.email_verified);

    let record = h
        .tokens
        .issue(&user.id, PURPOSE_VERIFY_EMAIL, Duration::hours(24))
        .await
        .unwrap();

    let verified = h
        .identity
        .verify_email(trusted(), &record.token)
        .await
        .unwrap();
    assert!(verified.email_verified);

    // The pending session observes the flip without re-authenticating.
    let (checked, _) = h.identity.session_check(&session.token).await.unwrap();
    assert!(checked.email_verified);
}

#[tokio::test]
async fn test_verification_token_single_use_under_concurrency() {
    let h = harness();
    let (user, _) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    let record = h
        .tokens
        .issue(&user.id, PURPOSE_VERIFY_EMAIL, Duration::hours(24))
        .await
        .unwrap();

    let a = h.identity.verify_email(trusted(), &record.token);
    let b = h.identity.verify_email(trusted(), &record.token);
    let (ra, rb) = tokio::join!(a, b);

    let (oks, errs): (Vec<_>, Vec<_>) = [ra, rb].into_iter().partition(Result::is_ok);
    assert_eq!(oks.len(), 1);
    assert!(matches!(errs[0], Err(AuthError::TokenAlreadyUsed)));

    // Sequential replay fails the same way.
    let err = h
        .identity
        .verify_email(trusted(), &record.token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenAlreadyUsed));
}

#[tokio::test]
async fn test_expired_verification_token_rejected() {
    let h = harness();
    let (user, _) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    let record = h
        .tokens
        .issue(&user.id, PURPOSE_VERIFY_EMAIL, Duration::milliseconds(10))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let err = h
        .identity
        .verify_email(trusted(), &record.token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenExpired));

    let user = h.store.get_user_by_id(&user.id).await.unwrap().unwrap();
    assert!(!user.email_verified);
}

#[tokio::test]
async fn test_resend_issues_a_redeemable_token() {
    let h = harness();
    let (user, session) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    // A user whose original token was lost asks for a new one.
    let record = h.credentials.send_verification(&user).await.unwrap();
    let verified = h
        .identity
        .verify_email(trusted(), &record.token)
        .await
        .unwrap();
    assert!(verified.email_verified);

    // Resending after verification is an acknowledged no-op.
    h.identity
        .resend_verification(trusted(), &session.token)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_resend_requires_a_valid_session() {
    let h = harness();
    let err = h
        .identity
        .resend_verification(trusted(), "no-such-token")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));
}

#[tokio::test]
async fn test_verify_email_for_deleted_user_is_not_a_token_error() {
    let h = harness();
    let (user, _) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();
    let record = h
        .tokens
        .issue(&user.id, PURPOSE_VERIFY_EMAIL, Duration::hours(24))
        .await
        .unwrap();

    h.store.delete_user(&user.id).await.unwrap();

    // An account delete racing the redemption must not masquerade as a bad
    // token, which the client would tell the user to re-request.
    let err = h
        .identity
        .verify_email(trusted(), &record.token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::StorageUnavailable));
}

#[tokio::test]
async fn test_unknown_verification_token_rejected() {
    let h = harness();
    let err = h
        .identity
        .verify_email(trusted(), "not-a-real-token")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFound));
}

// ---- sessions ----

#[tokio::test]
async fn test_session_sliding_window_extends_on_activity() {
    let h = harness_with(
        Duration::milliseconds(250),
        Duration::seconds(10),
        false,
    );
    let (_, session) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    // Each check lands inside the current window and pushes it forward,
    // carrying the session well past the original 250ms expiry.
    for _ in 0..4 {
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        h.identity.session_check(&session.token).await.unwrap();
    }
}

#[tokio::test]
async fn test_session_expires_without_activity() {
    let h = harness_with(
        Duration::milliseconds(100),
        Duration::seconds(10),
        false,
    );
    let (_, session) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let err = h.identity.session_check(&session.token).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired));
}

#[tokio::test]
async fn test_session_absolute_cap_beats_sliding_window() {
    let h = harness_with(
        Duration::milliseconds(300),
        Duration::milliseconds(700),
        false,
    );
    let (_, session) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    // Constant activity keeps the window sliding, but never past the cap.
    for _ in 0..3 {
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        h.identity.session_check(&session.token).await.unwrap();
    }

    tokio::time::sleep(std::time::Duration::from_millis(450)).await;
    let err = h.identity.session_check(&session.token).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired));
}

#[tokio::test]
async fn test_sign_out_revokes_and_is_idempotent() {
    let h = harness();
    let (_, session) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    // Sign-out is plain session destruction, so no Origin header is needed.
    h.identity.sign_out(&session.token).await.unwrap();

    let err = h.identity.session_check(&session.token).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionRevoked));

    // Revoking again, or revoking garbage, is fine.
    h.identity.sign_out(&session.token).await.unwrap();
    h.identity.sign_out("no-such-token").await.unwrap();
}

#[tokio::test]
async fn test_unknown_session_token_not_found() {
    let h = harness();
    let err = h.identity.session_check("no-such-token").await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));
}

#[tokio::test]
async fn test_sign_out_all_spares_the_calling_session() {
    let h = harness();
    let (_, first) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();
    let (_, second) = h
        .identity
        .sign_in(trusted(), "ada@example.com", "correct horse 9", client())
        .await
        .unwrap();
    let (_, third) = h
        .identity
        .sign_in(trusted(), "ada@example.com", "correct horse 9", client())
        .await
        .unwrap();

    let revoked = h
        .identity
        .sign_out_all(trusted(), &second.token)
        .await
        .unwrap();
    assert_eq!(revoked, 2);

    assert!(matches!(
        h.identity.session_check(&first.token).await.unwrap_err(),
        AuthError::SessionRevoked
    ));
    assert!(matches!(
        h.identity.session_check(&third.token).await.unwrap_err(),
        AuthError::SessionRevoked
    ));
    h.identity.session_check(&second.token).await.unwrap();
}

#[tokio::test]
async fn test_change_password_rotates_credential_and_other_sessions() {
    let h = harness();
    let (_, keeper) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();
    let (_, other) = h
        .identity
        .sign_in(trusted(), "ada@example.com", "correct horse 9", client())
        .await
        .unwrap();

    h.identity
        .change_password(trusted(), &keeper.token, "correct horse 9", "better horses 10")
        .await
        .unwrap();

    // Old password is dead, new one works.
    assert!(matches!(
        h.identity
            .sign_in(trusted(), "ada@example.com", "correct horse 9", client())
            .await
            .unwrap_err(),
        AuthError::InvalidCredentials
    ));
    h.identity
        .sign_in(trusted(), "ada@example.com", "better horses 10", client())
        .await
        .unwrap();

    // The caller keeps their session; the other device is signed out.
    h.identity.session_check(&keeper.token).await.unwrap();
    assert!(matches!(
        h.identity.session_check(&other.token).await.unwrap_err(),
        AuthError::SessionRevoked
    ));
}

#[tokio::test]
async fn test_change_password_requires_the_old_password() {
    let h = harness();
    let (_, session) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    let err = h
        .identity
        .change_password(trusted(), &session.token, "wrong old 12", "better horses 10")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    // Credential unchanged.
    h.identity
        .sign_in(trusted(), "ada@example.com", "correct horse 9", client())
        .await
        .unwrap();
}

// ---- trusted origins ----

/// Store wrapper that counts every call, to prove the origin gate runs
/// before any storage access.
struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthStore for CountingStore {
    async fn create_user_with_credential(
        &self,
        user: &UserRecord,
        credential: &CredentialRecord,
    ) -> Result<(), StoreError> {
        self.tick();
        self.inner.create_user_with_credential(user, credential).await
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        self.tick();
        self.inner.create_user(user).await
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.tick();
        self.inner.get_user_by_id(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.tick();
        self.inner.get_user_by_email(email).await
    }

    async fn set_email_verified(&self, user_id: &str) -> Result<(), StoreError> {
        self.tick();
        self.inner.set_email_verified(user_id).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
        self.tick();
        self.inner.delete_user(user_id).await
    }

    async fn get_credential(&self, user_id: &str) -> Result<Option<CredentialRecord>, StoreError> {
        self.tick();
        self.inner.get_credential(user_id).await
    }

    async fn update_credential(
        &self,
        user_id: &str,
        password_hash: &str,
        hash_version: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.tick();
        self.inner
            .update_credential(user_id, password_hash, hash_version, updated_at)
            .await
    }

    async fn create_oauth_account(&self, account: &OAuthAccountRecord) -> Result<(), StoreError> {
        self.tick();
        self.inner.create_oauth_account(account).await
    }

    async fn get_oauth_account(
        &self,
        provider: &str,
        provider_subject_id: &str,
    ) -> Result<Option<OAuthAccountRecord>, StoreError> {
        self.tick();
        self.inner.get_oauth_account(provider, provider_subject_id).await
    }

    async fn create_verification_token(
        &self,
        token: &VerificationTokenRecord,
    ) -> Result<(), StoreError> {
        self.tick();
        self.inner.create_verification_token(token).await
    }

    async fn get_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<VerificationTokenRecord>, StoreError> {
        self.tick();
        self.inner.get_verification_token(token).await
    }

    async fn consume_verification_token(&self, token: &str) -> Result<bool, StoreError> {
        self.tick();
        self.inner.consume_verification_token(token).await
    }

    async fn delete_dead_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        self.tick();
        self.inner.delete_dead_tokens(now).await
    }

    async fn create_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        self.tick();
        self.inner.create_session(session).await
    }

    async fn get_session(&self, token: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.tick();
        self.inner.get_session(token).await
    }

    async fn touch_session(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.tick();
        self.inner.touch_session(token, expires_at).await
    }

    async fn revoke_session(&self, token: &str) -> Result<(), StoreError> {
        self.tick();
        self.inner.revoke_session(token).await
    }

    async fn revoke_sessions_for_user(
        &self,
        user_id: &str,
        except_token: Option<&str>,
    ) -> Result<u64, StoreError> {
        self.tick();
        self.inner.revoke_sessions_for_user(user_id, except_token).await
    }
}

#[tokio::test]
async fn test_untrusted_origin_rejected_before_any_storage_access() {
    let counting = Arc::new(CountingStore::new());
    let h = harness_on(
        counting.clone(),
        Duration::days(7),
        Duration::days(30),
        false,
    );

    let untrusted = Some("http://evil.example");

    let err = h
        .identity
        .sign_in(untrusted, "ada@example.com", "correct horse 9", client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UntrustedOrigin));

    let err = h
        .identity
        .sign_up(untrusted, "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UntrustedOrigin));

    // Missing origin is denied, not allowed through.
    let err = h
        .identity
        .sign_in(None, "ada@example.com", "correct horse 9", client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UntrustedOrigin));

    assert_eq!(counting.count(), 0);
}

#[tokio::test]
async fn test_origin_match_is_exact() {
    let h = harness();
    for origin in [
        "http://localhost:3001",
        "https://localhost:3000",
        "http://sub.localhost:3000",
        "http://localhost:3000.evil.example",
    ] {
        let err = h
            .identity
            .sign_in(Some(origin), "ada@example.com", "correct horse 9", client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UntrustedOrigin), "origin {origin}");
    }
}

// ---- oauth linking ----

fn profile(subject: &str, email: &str, verified: bool) -> ProviderProfile {
    ProviderProfile {
        subject: subject.to_string(),
        email: email.to_string(),
        name: Some("Ada".to_string()),
        email_verified: verified,
    }
}

#[tokio::test]
async fn test_oauth_first_sign_in_creates_verified_user() {
    let h = harness();

    let user = h
        .oauth
        .link_profile("google", &profile("sub-1", "ada@example.com", true))
        .await
        .unwrap();
    assert!(user.email_verified);

    // Same provider identity resolves to the same user next time.
    let again = h
        .oauth
        .link_profile("google", &profile("sub-1", "ada@example.com", true))
        .await
        .unwrap();
    assert_eq!(again.id, user.id);
}

#[tokio::test]
async fn test_oauth_links_to_verified_local_account() {
    let h = harness();
    let (user, _) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    let record = h
        .tokens
        .issue(&user.id, PURPOSE_VERIFY_EMAIL, Duration::hours(24))
        .await
        .unwrap();
    h.identity.verify_email(trusted(), &record.token).await.unwrap();

    let linked = h
        .oauth
        .link_profile("google", &profile("sub-1", "Ada@Example.com", true))
        .await
        .unwrap();
    assert_eq!(linked.id, user.id);

    let account = h
        .store
        .get_oauth_account("google", "sub-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.user_id, user.id);
}

#[tokio::test]
async fn test_oauth_never_auto_links_to_unverified_account() {
    let h = harness();
    let (user, _) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();
    assert!(!user.email_verified);

    let err = h
        .oauth
        .link_profile("google", &profile("sub-1", "ada@example.com", true))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountExists));

    // No link was created and the local account is untouched.
    assert!(h
        .store
        .get_oauth_account("google", "sub-1")
        .await
        .unwrap()
        .is_none());
    assert!(h
        .store
        .get_credential(&user.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_oauth_links_to_unverified_account_when_enabled() {
    let h = harness_with(Duration::days(7), Duration::days(30), true);
    let (user, _) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();

    let linked = h
        .oauth
        .link_profile("google", &profile("sub-1", "ada@example.com", true))
        .await
        .unwrap();
    assert_eq!(linked.id, user.id);
}

#[tokio::test]
async fn test_oauth_unverified_profile_email_does_not_link() {
    let h = harness();
    let (user, _) = h
        .identity
        .sign_up(trusted(), "ada@example.com", "Ada", "correct horse 9", client())
        .await
        .unwrap();
    let record = h
        .tokens
        .issue(&user.id, PURPOSE_VERIFY_EMAIL, Duration::hours(24))
        .await
        .unwrap();
    h.identity.verify_email(trusted(), &record.token).await.unwrap();

    // Provider does not vouch for the address: no link even though the
    // local side is verified.
    let err = h
        .oauth
        .link_profile("github", &profile("sub-2", "ada@example.com", false))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountExists));
}

#[tokio::test]
async fn test_oauth_unknown_provider_is_a_provider_error() {
    let h = harness();
    let err = h
        .identity
        .oauth_sign_in(trusted(), "myspace", "code", client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Provider(_)));
}
