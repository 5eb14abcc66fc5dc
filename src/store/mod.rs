// src/store/mod.rs
//! Persistence adapter for the identity core
//!
//! Every component reads and writes durable state through the [`AuthStore`]
//! trait, never through a concrete storage technology. The trait is narrow:
//! per-entity create/read/update/delete, one compare-and-set primitive
//! (token consumption), one transactional create (user + credential), and
//! one cascading delete (user removal).

pub mod memory;
pub mod records;
pub mod sqlite;

pub use memory::MemoryStore;
pub use records::{
    CredentialRecord, OAuthAccountRecord, SessionRecord, UserRecord, VerificationTokenRecord,
};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use thiserror::Error;
use tracing::warn;

/// Storage failures surfaced to the identity components.
///
/// `Conflict` and `NotFound` are definite outcomes; `Database` is the only
/// transient kind and the only one eligible for retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("record not found")]
    NotFound,

    #[error("storage error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage interface the identity core depends on.
///
/// Implementations must guarantee:
/// - email uniqueness is enforced by the store itself, not read-then-write
/// - [`consume_verification_token`](AuthStore::consume_verification_token)
///   flips consumed exactly once under concurrency
/// - [`touch_session`](AuthStore::touch_session) is last-writer-wins on the
///   single session row
#[async_trait]
pub trait AuthStore: Send + Sync {
    // ---- users ----

    /// Create a user together with their password credential as one
    /// transactional unit. A request aborted mid-flight must never leave a
    /// user row without a credential.
    async fn create_user_with_credential(
        &self,
        user: &UserRecord,
        credential: &CredentialRecord,
    ) -> Result<(), StoreError>;

    /// Create a user without a password credential (OAuth-originated users).
    async fn create_user(&self, user: &UserRecord) -> Result<(), StoreError>;

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Lookup by normalized email.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn set_email_verified(&self, user_id: &str) -> Result<(), StoreError>;

    /// Cascading delete: removes the user's credential, OAuth accounts, and
    /// sessions along with the user row.
    async fn delete_user(&self, user_id: &str) -> Result<(), StoreError>;

    // ---- credentials ----

    async fn get_credential(&self, user_id: &str) -> Result<Option<CredentialRecord>, StoreError>;

    async fn update_credential(
        &self,
        user_id: &str,
        password_hash: &str,
        hash_version: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // ---- oauth accounts ----

    /// Conflict when the (provider, provider_subject_id) pair already exists.
    async fn create_oauth_account(&self, account: &OAuthAccountRecord) -> Result<(), StoreError>;

    async fn get_oauth_account(
        &self,
        provider: &str,
        provider_subject_id: &str,
    ) -> Result<Option<OAuthAccountRecord>, StoreError>;

    // ---- verification tokens ----

    async fn create_verification_token(
        &self,
        token: &VerificationTokenRecord,
    ) -> Result<(), StoreError>;

    async fn get_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<VerificationTokenRecord>, StoreError>;

    /// Compare-and-set: consumed false -> true. Returns `true` for the one
    /// caller that flipped the flag, `false` for everyone else.
    async fn consume_verification_token(&self, token: &str) -> Result<bool, StoreError>;

    /// Garbage-collect expired or consumed tokens. Returns the removed count.
    async fn delete_dead_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    // ---- sessions ----

    async fn create_session(&self, session: &SessionRecord) -> Result<(), StoreError>;

    async fn get_session(&self, token: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Sliding-expiry update. Last writer wins; revoked sessions are
    /// never extended.
    async fn touch_session(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Idempotent: revoking a revoked or unknown session is not an error.
    async fn revoke_session(&self, token: &str) -> Result<(), StoreError>;

    /// Revoke every active session for the user, optionally keeping one
    /// (the caller's own). Returns the number revoked.
    async fn revoke_sessions_for_user(
        &self,
        user_id: &str,
        except_token: Option<&str>,
    ) -> Result<u64, StoreError>;
}

/// Maximum attempts for a transient storage failure.
const RETRY_ATTEMPTS: u32 = 3;

/// Initial backoff before the first retry.
const RETRY_BASE_DELAY_MS: u64 = 50;

/// Bounded retry with doubling backoff for transient storage failures.
///
/// Only `StoreError::Database` is retried: `Conflict` and `NotFound` are
/// definite outcomes. Callers apply this to idempotent operations only.
pub async fn with_retry<T, F, Fut>(operation: &str, f: F) -> Result<T, StoreError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut delay = std::time::Duration::from_millis(RETRY_BASE_DELAY_MS);
    let mut attempt = 1;

    loop {
        match f().await {
            Err(StoreError::Database(e)) if attempt < RETRY_ATTEMPTS => {
                warn!(
                    error = %e,
                    operation = %operation,
                    attempt = attempt,
                    "Transient storage failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            other => return other,
        }
    }
}
