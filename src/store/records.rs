// src/store/records.rs
//! Persisted entity records
//!
//! Row-shaped structs shared by every [`AuthStore`](super::AuthStore)
//! implementation. The services construct these (they own IDs, tokens, and
//! timestamps), the store only persists them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// User identity record. The root entity; everything else hangs off it.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    /// Stored normalized (lowercase); unique at the storage layer.
    pub email: String,
    pub display_name: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Password credential, one per user.
///
/// Deliberately not `Serialize`: credential rows never leave the server.
#[derive(FromRow, Debug, Clone)]
pub struct CredentialRecord {
    pub user_id: String,
    /// Salted PHC-format hash, never the raw password.
    pub password_hash: String,
    /// Which hash scheme produced the hash, for future migration.
    pub hash_version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Link between an upstream provider identity and a local user.
/// (provider, provider_subject_id) is globally unique.
#[derive(FromRow, Debug, Clone)]
pub struct OAuthAccountRecord {
    pub provider: String,
    pub provider_subject_id: String,
    pub user_id: String,
    pub linked_at: DateTime<Utc>,
}

/// Single-use, time-limited proof of control over an email address.
#[derive(FromRow, Debug, Clone)]
pub struct VerificationTokenRecord {
    pub token: String,
    pub user_id: String,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

/// A session row. Valid iff not expired and not revoked; revocation is
/// irreversible.
#[derive(FromRow, Debug, Clone)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    /// Audit metadata declared by the client at issue time.
    pub client_origin: Option<String>,
    pub user_agent: Option<String>,
}
