// src/services/origins.rs
//! Trusted origin validator
//!
//! Exact-match scheme+host+port gate in front of every credential-exchange
//! operation. Default-deny: no wildcards, no substring matching, so
//! `https://evil-app.example.com` never rides on a trust grant for
//! `https://app.example.com`.

use std::collections::HashSet;
use tracing::warn;

use super::AuthError;

#[derive(Debug, Clone)]
pub struct TrustedOrigins {
    origins: HashSet<String>,
}

impl TrustedOrigins {
    pub fn new(origins: HashSet<String>) -> Self {
        Self { origins }
    }

    /// Exact membership test after trailing-slash normalization.
    pub fn is_trusted(&self, origin: &str) -> bool {
        self.origins.contains(origin.trim_end_matches('/'))
    }

    /// Gate for credential exchange. A missing origin is denied: absence of
    /// a declared origin is not trust.
    pub fn require_trusted(&self, origin: Option<&str>) -> Result<(), AuthError> {
        match origin {
            Some(o) if self.is_trusted(o) => Ok(()),
            Some(o) => {
                warn!(origin = %o, "Credential exchange rejected: untrusted origin");
                Err(AuthError::UntrustedOrigin)
            }
            None => {
                warn!("Credential exchange rejected: no origin declared");
                Err(AuthError::UntrustedOrigin)
            }
        }
    }
}
