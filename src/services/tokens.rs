// src/services/tokens.rs
//! Verification token issuer
//!
//! Single-use, time-limited tokens proving control of an email address.
//! Redemption is replay-safe: the store's compare-and-set on the consumed
//! flag guarantees exactly one of two concurrent redeemers wins.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::AuthError;
use crate::common::helpers::safe_token_log;
use crate::common::id_generator::generate_verification_token;
use crate::store::{with_retry, AuthStore, StoreError, VerificationTokenRecord};

/// Token purpose for the email verification flow.
pub const PURPOSE_VERIFY_EMAIL: &str = "verify-email";

/// How many times to regenerate on a (vanishingly unlikely) token collision.
const ISSUE_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct VerificationTokenService {
    store: Arc<dyn AuthStore>,
}

impl VerificationTokenService {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    /// Issue a fresh single-use token for the user.
    ///
    /// Expired and consumed tokens are garbage-collected opportunistically
    /// here; a GC failure never fails the issue itself.
    pub async fn issue(
        &self,
        user_id: &str,
        purpose: &str,
        ttl: Duration,
    ) -> Result<VerificationTokenRecord, AuthError> {
        match self.store.delete_dead_tokens(Utc::now()).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed = removed, "Garbage-collected dead verification tokens"),
            Err(e) => warn!(error = %e, "Verification token GC failed, continuing"),
        }

        for _ in 0..ISSUE_ATTEMPTS {
            let record = VerificationTokenRecord {
                token: generate_verification_token(),
                user_id: user_id.to_string(),
                purpose: purpose.to_string(),
                expires_at: Utc::now() + ttl,
                consumed: false,
            };

            match self.store.create_verification_token(&record).await {
                Ok(()) => {
                    info!(
                        user_id = %user_id,
                        purpose = %purpose,
                        token = %safe_token_log(&record.token),
                        "Verification token issued"
                    );
                    return Ok(record);
                }
                // 130 bits of entropy collided; roll again.
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(AuthError::storage(e)),
            }
        }

        Err(AuthError::StorageUnavailable)
    }

    /// Redeem a token, consuming it exactly once.
    ///
    /// Failure order: unknown token (or wrong purpose, deliberately
    /// indistinguishable), already consumed, expired. The final
    /// compare-and-set settles concurrent redemptions: the loser observes
    /// `TokenAlreadyUsed` even though its earlier read saw an unconsumed row.
    pub async fn redeem(&self, token: &str, purpose: &str) -> Result<String, AuthError> {
        let record = with_retry("get_verification_token", || {
            self.store.get_verification_token(token)
        })
        .await
        .map_err(AuthError::storage)?
        .ok_or(AuthError::TokenNotFound)?;

        if record.purpose != purpose {
            warn!(
                token = %safe_token_log(token),
                expected = %purpose,
                actual = %record.purpose,
                "Verification token presented for the wrong purpose"
            );
            return Err(AuthError::TokenNotFound);
        }

        if record.consumed {
            return Err(AuthError::TokenAlreadyUsed);
        }

        if record.expires_at < Utc::now() {
            return Err(AuthError::TokenExpired);
        }

        let consumed = self
            .store
            .consume_verification_token(token)
            .await
            .map_err(AuthError::storage)?;
        if !consumed {
            return Err(AuthError::TokenAlreadyUsed);
        }

        info!(
            user_id = %record.user_id,
            purpose = %purpose,
            token = %safe_token_log(token),
            "Verification token redeemed"
        );

        Ok(record.user_id)
    }
}
