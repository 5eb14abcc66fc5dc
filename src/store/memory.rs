// src/store/memory.rs
//! In-memory persistence adapter
//!
//! Backs the identity core with plain maps behind a mutex. Exists to prove
//! the storage swap guarantee and to give tests an adapter with no I/O; it
//! upholds the same uniqueness and compare-and-set semantics as the SQLite
//! store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::records::{
    CredentialRecord, OAuthAccountRecord, SessionRecord, UserRecord, VerificationTokenRecord,
};
use super::{AuthStore, StoreError};

#[derive(Default)]
struct Inner {
    /// user id -> user
    users: HashMap<String, UserRecord>,
    /// normalized email -> user id
    users_by_email: HashMap<String, String>,
    /// user id -> credential
    credentials: HashMap<String, CredentialRecord>,
    /// (provider, provider_subject_id) -> account
    oauth_accounts: HashMap<(String, String), OAuthAccountRecord>,
    /// token value -> token
    tokens: HashMap<String, VerificationTokenRecord>,
    /// session token -> session
    sessions: HashMap<String, SessionRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock is only held across in-memory map operations, never across
    /// an await point. A poisoned lock carries consistent-enough data for an
    /// identity map, so recover instead of panicking.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn email_key(email: &str) -> String {
    email.to_lowercase()
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn create_user_with_credential(
        &self,
        user: &UserRecord,
        credential: &CredentialRecord,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let key = email_key(&user.email);
        if inner.users_by_email.contains_key(&key) {
            return Err(StoreError::Conflict("email already exists".to_string()));
        }
        inner.users_by_email.insert(key, user.id.clone());
        inner.users.insert(user.id.clone(), user.clone());
        inner
            .credentials
            .insert(credential.user_id.clone(), credential.clone());
        Ok(())
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let key = email_key(&user.email);
        if inner.users_by_email.contains_key(&key) {
            return Err(StoreError::Conflict("email already exists".to_string()));
        }
        inner.users_by_email.insert(key, user.id.clone());
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.lock().users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.lock();
        let id = match inner.users_by_email.get(&email_key(email)) {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(inner.users.get(id).cloned())
    }

    async fn set_email_verified(&self, user_id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.users.get_mut(user_id) {
            Some(user) => {
                user.email_verified = true;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let user = inner.users.remove(user_id).ok_or(StoreError::NotFound)?;
        inner.users_by_email.remove(&email_key(&user.email));
        inner.credentials.remove(user_id);
        inner.oauth_accounts.retain(|_, a| a.user_id != user_id);
        inner.sessions.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn get_credential(&self, user_id: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.lock().credentials.get(user_id).cloned())
    }

    async fn update_credential(
        &self,
        user_id: &str,
        password_hash: &str,
        hash_version: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.credentials.get_mut(user_id) {
            Some(credential) => {
                credential.password_hash = password_hash.to_string();
                credential.hash_version = hash_version;
                credential.updated_at = updated_at;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn create_oauth_account(&self, account: &OAuthAccountRecord) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let key = (
            account.provider.clone(),
            account.provider_subject_id.clone(),
        );
        if inner.oauth_accounts.contains_key(&key) {
            return Err(StoreError::Conflict(
                "provider identity already exists".to_string(),
            ));
        }
        inner.oauth_accounts.insert(key, account.clone());
        Ok(())
    }

    async fn get_oauth_account(
        &self,
        provider: &str,
        provider_subject_id: &str,
    ) -> Result<Option<OAuthAccountRecord>, StoreError> {
        let key = (provider.to_string(), provider_subject_id.to_string());
        Ok(self.lock().oauth_accounts.get(&key).cloned())
    }

    async fn create_verification_token(
        &self,
        token: &VerificationTokenRecord,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.tokens.contains_key(&token.token) {
            return Err(StoreError::Conflict("token already exists".to_string()));
        }
        inner.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn get_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<VerificationTokenRecord>, StoreError> {
        Ok(self.lock().tokens.get(token).cloned())
    }

    async fn consume_verification_token(&self, token: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.tokens.get_mut(token) {
            Some(record) if !record.consumed => {
                record.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_dead_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let before = inner.tokens.len();
        inner
            .tokens
            .retain(|_, t| !t.consumed && t.expires_at >= now);
        Ok((before - inner.tokens.len()) as u64)
    }

    async fn create_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.sessions.contains_key(&session.token) {
            return Err(StoreError::Conflict("session already exists".to_string()));
        }
        inner.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.lock().sessions.get(token).cloned())
    }

    async fn touch_session(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(session) = inner.sessions.get_mut(token) {
            if !session.revoked {
                session.expires_at = expires_at;
            }
        }
        Ok(())
    }

    async fn revoke_session(&self, token: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(session) = inner.sessions.get_mut(token) {
            session.revoked = true;
        }
        Ok(())
    }

    async fn revoke_sessions_for_user(
        &self,
        user_id: &str,
        except_token: Option<&str>,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let mut count = 0;
        for session in inner.sessions.values_mut() {
            if session.user_id == user_id
                && !session.revoked
                && Some(session.token.as_str()) != except_token
            {
                session.revoked = true;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(id: &str, email: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            email: email.to_string(),
            display_name: "Test User".to_string(),
            email_verified: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_email_conflict_case_insensitive() {
        let store = MemoryStore::new();
        store.create_user(&user("U_AAAAAA", "a@example.com")).await.unwrap();

        let err = store
            .create_user(&user("U_BBBBBB", "A@Example.Com"))
            .await
            .expect_err("duplicate email");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_consume_token_exactly_once() {
        let store = MemoryStore::new();
        store
            .create_verification_token(&VerificationTokenRecord {
                token: "T".to_string(),
                user_id: "U_AAAAAA".to_string(),
                purpose: "verify-email".to_string(),
                expires_at: Utc::now() + Duration::hours(1),
                consumed: false,
            })
            .await
            .unwrap();

        assert!(store.consume_verification_token("T").await.unwrap());
        assert!(!store.consume_verification_token("T").await.unwrap());
    }

    #[tokio::test]
    async fn test_touch_never_extends_revoked_session() {
        let store = MemoryStore::new();
        let issued = Utc::now();
        store
            .create_session(&SessionRecord {
                token: "S".to_string(),
                user_id: "U_AAAAAA".to_string(),
                issued_at: issued,
                expires_at: issued + Duration::hours(1),
                revoked: false,
                client_origin: None,
                user_agent: None,
            })
            .await
            .unwrap();

        store.revoke_session("S").await.unwrap();
        store
            .touch_session("S", issued + Duration::hours(10))
            .await
            .unwrap();

        let session = store.get_session("S").await.unwrap().expect("session");
        assert!(session.revoked);
        assert_eq!(session.expires_at, issued + Duration::hours(1));
    }
}
