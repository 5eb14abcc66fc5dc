// src/store/sqlite.rs
//! SQLite-backed persistence adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::records::{
    CredentialRecord, OAuthAccountRecord, SessionRecord, UserRecord, VerificationTokenRecord,
};
use super::{AuthStore, StoreError};

/// Production [`AuthStore`] on top of a `SqlitePool`.
///
/// Uniqueness (user email, OAuth subject pairs) is enforced by UNIQUE
/// constraints, so concurrent inserts race safely and the loser observes a
/// `Conflict`. Token consumption and session touches are single-statement
/// UPDATEs guarded by the flag column.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Map an insert failure, turning unique-constraint violations into Conflict.
fn map_insert_error(e: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return StoreError::Conflict(format!("{} already exists", what));
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl AuthStore for SqliteStore {
    async fn create_user_with_credential(
        &self,
        user: &UserRecord,
        credential: &CredentialRecord,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, email, display_name, email_verified, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.email_verified)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "email"))?;

        sqlx::query(
            "INSERT INTO credentials (user_id, password_hash, hash_version, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&credential.user_id)
        .bind(&credential.password_hash)
        .bind(credential.hash_version)
        .bind(credential.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, email, display_name, email_verified, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.email_verified)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "email"))?;
        Ok(())
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_email_verified(&self, user_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET email_verified = 1 WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
        // Explicit cascade inside one transaction rather than relying on the
        // foreign_keys pragma being set on every connection.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM oauth_accounts WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM credentials WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_credential(&self, user_id: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let credential =
            sqlx::query_as::<_, CredentialRecord>("SELECT * FROM credentials WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(credential)
    }

    async fn update_credential(
        &self,
        user_id: &str,
        password_hash: &str,
        hash_version: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE credentials SET password_hash = ?, hash_version = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(password_hash)
        .bind(hash_version)
        .bind(updated_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_oauth_account(&self, account: &OAuthAccountRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO oauth_accounts (provider, provider_subject_id, user_id, linked_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&account.provider)
        .bind(&account.provider_subject_id)
        .bind(&account.user_id)
        .bind(account.linked_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "provider identity"))?;
        Ok(())
    }

    async fn get_oauth_account(
        &self,
        provider: &str,
        provider_subject_id: &str,
    ) -> Result<Option<OAuthAccountRecord>, StoreError> {
        let account = sqlx::query_as::<_, OAuthAccountRecord>(
            "SELECT * FROM oauth_accounts WHERE provider = ? AND provider_subject_id = ?",
        )
        .bind(provider)
        .bind(provider_subject_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn create_verification_token(
        &self,
        token: &VerificationTokenRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO verification_tokens (token, user_id, purpose, expires_at, consumed) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&token.token)
        .bind(&token.user_id)
        .bind(&token.purpose)
        .bind(token.expires_at)
        .bind(token.consumed)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "token"))?;
        Ok(())
    }

    async fn get_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<VerificationTokenRecord>, StoreError> {
        let record = sqlx::query_as::<_, VerificationTokenRecord>(
            "SELECT * FROM verification_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn consume_verification_token(&self, token: &str) -> Result<bool, StoreError> {
        // Compare-and-set on the consumed flag: of two concurrent redeemers
        // exactly one sees rows_affected = 1.
        let result =
            sqlx::query("UPDATE verification_tokens SET consumed = 1 WHERE token = ? AND consumed = 0")
                .bind(token)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_dead_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM verification_tokens WHERE consumed = 1 OR expires_at < ?")
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn create_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, issued_at, expires_at, revoked, client_origin, user_agent) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(session.issued_at)
        .bind(session.expires_at)
        .bind(session.revoked)
        .bind(session.client_origin.as_deref())
        .bind(session.user_agent.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "session"))?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<SessionRecord>, StoreError> {
        let session = sqlx::query_as::<_, SessionRecord>("SELECT * FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn touch_session(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Last writer wins; a revoked session is never extended.
        sqlx::query("UPDATE sessions SET expires_at = ? WHERE token = ? AND revoked = 0")
            .bind(expires_at)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_session(&self, token: &str) -> Result<(), StoreError> {
        // Idempotent by construction: zero rows affected is still success.
        sqlx::query("UPDATE sessions SET revoked = 1 WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_sessions_for_user(
        &self,
        user_id: &str,
        except_token: Option<&str>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked = 1 WHERE user_id = ? AND revoked = 0 AND token <> ?",
        )
        .bind(user_id)
        // Tokens are never empty, so an empty sentinel excludes nothing.
        .bind(except_token.unwrap_or(""))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::run_migrations;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteStore {
        // Single connection so the in-memory database is shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        run_migrations(&pool).await.expect("migrations");
        SqliteStore::new(pool)
    }

    fn user(id: &str, email: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            email: email.to_string(),
            display_name: "Test User".to_string(),
            email_verified: false,
            created_at: Utc::now(),
        }
    }

    fn credential(user_id: &str) -> CredentialRecord {
        CredentialRecord {
            user_id: user_id.to_string(),
            password_hash: "$argon2id$fake".to_string(),
            hash_version: 1,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let store = test_store().await;
        store
            .create_user_with_credential(&user("U_AAAAAA", "a@example.com"), &credential("U_AAAAAA"))
            .await
            .expect("first insert");

        let err = store
            .create_user_with_credential(&user("U_BBBBBB", "a@example.com"), &credential("U_BBBBBB"))
            .await
            .expect_err("duplicate email must fail");
        assert!(matches!(err, StoreError::Conflict(_)));

        // The failed transaction must not leave a partial user behind.
        let loser = store.get_user_by_id("U_BBBBBB").await.expect("query");
        assert!(loser.is_none());
    }

    #[tokio::test]
    async fn test_email_unique_is_case_insensitive() {
        let store = test_store().await;
        store
            .create_user(&user("U_AAAAAA", "a@example.com"))
            .await
            .expect("insert");

        let err = store
            .create_user(&user("U_BBBBBB", "A@EXAMPLE.COM"))
            .await
            .expect_err("case-folded duplicate must fail");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_token_cas_consumes_once() {
        let store = test_store().await;
        store.create_user(&user("U_AAAAAA", "a@example.com")).await.unwrap();

        let record = VerificationTokenRecord {
            token: "TESTTOKEN".to_string(),
            user_id: "U_AAAAAA".to_string(),
            purpose: "verify-email".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            consumed: false,
        };
        store.create_verification_token(&record).await.unwrap();

        assert!(store.consume_verification_token("TESTTOKEN").await.unwrap());
        assert!(!store.consume_verification_token("TESTTOKEN").await.unwrap());
        assert!(!store.consume_verification_token("MISSING").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let store = test_store().await;
        store
            .create_user_with_credential(&user("U_AAAAAA", "a@example.com"), &credential("U_AAAAAA"))
            .await
            .unwrap();
        store
            .create_session(&SessionRecord {
                token: "SESSTOKEN".to_string(),
                user_id: "U_AAAAAA".to_string(),
                issued_at: Utc::now(),
                expires_at: Utc::now() + Duration::hours(1),
                revoked: false,
                client_origin: None,
                user_agent: None,
            })
            .await
            .unwrap();

        store.delete_user("U_AAAAAA").await.unwrap();

        assert!(store.get_user_by_id("U_AAAAAA").await.unwrap().is_none());
        assert!(store.get_credential("U_AAAAAA").await.unwrap().is_none());
        assert!(store.get_session("SESSTOKEN").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_all_keeps_excepted_session() {
        let store = test_store().await;
        store.create_user(&user("U_AAAAAA", "a@example.com")).await.unwrap();

        for token in ["S1", "S2", "S3"] {
            store
                .create_session(&SessionRecord {
                    token: token.to_string(),
                    user_id: "U_AAAAAA".to_string(),
                    issued_at: Utc::now(),
                    expires_at: Utc::now() + Duration::hours(1),
                    revoked: false,
                    client_origin: None,
                    user_agent: None,
                })
                .await
                .unwrap();
        }

        let revoked = store
            .revoke_sessions_for_user("U_AAAAAA", Some("S2"))
            .await
            .unwrap();
        assert_eq!(revoked, 2);

        let kept = store.get_session("S2").await.unwrap().expect("kept session");
        assert!(!kept.revoked);
    }
}
