// src/services/password.rs
//! Password policy and hashing
//!
//! Argon2id with per-password random salts. The PHC-format hash string is
//! the only thing that ever reaches the store; raw passwords are not stored
//! and not logged anywhere in this module.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use tracing::{error, warn};

use super::AuthError;
use crate::common::config::PasswordPolicy;

/// Hash scheme identifier persisted with each credential. Bump when the
/// hashing parameters change so old hashes can be migrated at next login.
pub const HASH_VERSION: i64 = 1;

/// Validate a raw password against the configured policy.
pub fn validate_password(password: &str, policy: &PasswordPolicy) -> Result<(), AuthError> {
    if password.chars().count() < policy.min_length {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {} characters",
            policy.min_length
        )));
    }

    if policy.require_mixed_classes {
        let has_letter = password.chars().any(|c| c.is_alphabetic());
        let has_other = password.chars().any(|c| !c.is_alphabetic());
        if !(has_letter && has_other) {
            return Err(AuthError::WeakPassword(
                "password must mix letters with digits or symbols".to_string(),
            ));
        }
    }

    Ok(())
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            // No password material in this log line.
            error!(error = %e, "Password hashing failed");
            AuthError::StorageUnavailable
        })
}

/// Verify a password against a stored PHC hash string.
///
/// Returns `false` rather than an error for an unparseable hash: the caller
/// reports generic `InvalidCredentials` either way, and a corrupt hash is
/// logged here.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, "Stored password hash is not parseable");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Burn roughly the same time as a real verification.
///
/// Called on the "no such user" and "no credential" paths so a failed
/// sign-in takes comparable time whether or not the account exists.
pub fn verify_dummy() {
    let _ = hash_password("dummy-password-for-timing");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(min_length: usize, mixed: bool) -> PasswordPolicy {
        PasswordPolicy {
            min_length,
            require_mixed_classes: mixed,
        }
    }

    #[test]
    fn test_rejects_short_passwords() {
        let err = validate_password("short1", &policy(8, false)).expect_err("too short");
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[test]
    fn test_rejects_single_class_passwords() {
        let err = validate_password("onlyletters", &policy(8, true)).expect_err("one class");
        assert!(matches!(err, AuthError::WeakPassword(_)));

        validate_password("Sup3r$ecret!", &policy(8, true)).expect("mixed classes pass");
        // Single class is fine when the policy does not require mixing.
        validate_password("onlyletters", &policy(8, false)).expect("policy off");
    }

    #[test]
    fn test_hash_then_verify_roundtrip() {
        let hash = hash_password("Sup3r$ecret!").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Sup3r$ecret!", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("Sup3r$ecret!").expect("hash");
        let b = hash_password("Sup3r$ecret!").expect("hash");
        assert_ne!(a, b, "same password must produce different salted hashes");
    }

    #[test]
    fn test_unparseable_hash_is_not_a_match() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
