// src/services/mod.rs
//
// Identity core components. Each component owns one concern and talks to
// durable state only through the store::AuthStore trait; IdentityService
// wires them together behind the transport-agnostic operations the HTTP
// layer exposes.

pub mod credentials;
pub mod email;
pub mod identity;
pub mod oauth;
pub mod origins;
pub mod password;
pub mod sessions;
pub mod tokens;

#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use credentials::CredentialService;
pub use identity::IdentityService;
pub use oauth::OAuthService;
pub use origins::TrustedOrigins;
pub use sessions::{ClientMetadata, SessionService};
pub use tokens::VerificationTokenService;

use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Domain failures of the identity core.
///
/// Every kind except `StorageUnavailable` is a definite outcome and is never
/// retried. `InvalidCredentials` deliberately merges "unknown user" and
/// "wrong password"; the distinction only appears in server-side logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account already exists")]
    AccountExists,

    #[error("password does not meet the policy: {0}")]
    WeakPassword(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("origin not trusted for credential exchange")]
    UntrustedOrigin,

    #[error("verification token not found")]
    TokenNotFound,

    #[error("verification token expired")]
    TokenExpired,

    #[error("verification token already used")]
    TokenAlreadyUsed,

    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    #[error("session revoked")]
    SessionRevoked,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("storage unavailable")]
    StorageUnavailable,
}

impl AuthError {
    /// Map a storage failure that has no domain meaning at this call site.
    ///
    /// `Conflict` and `NotFound` are mapped by the caller wherever they are
    /// expected outcomes; landing here means the store did something the
    /// component has no answer for, so the caller gets the generic transient
    /// failure and the detail goes to the log.
    pub(crate) fn storage(e: StoreError) -> Self {
        error!(error = %e, "Unexpected storage failure");
        AuthError::StorageUnavailable
    }
}
