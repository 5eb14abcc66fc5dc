// src/common/id_generator.rs
//! Crockford Base32 ID and token generator
//!
//! Entity IDs are short, human-readable, prefixed strings (U_K7NP3X).
//! Session handles and verification tokens are longer unprefixed strings
//! drawn from the OS random source, sized for at least 128 bits of entropy
//! (each Crockford character carries 5 bits).
//!
//! Benefits of the alphabet:
//! - No ambiguous characters (excludes I, L, O, U)
//! - Case-insensitive
//! - Easy to read, type, and communicate verbally

use rand::rngs::OsRng;
use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Session handles: 32 chars x 5 bits = 160 bits of entropy.
const SESSION_TOKEN_LENGTH: usize = 32;

/// Verification tokens: 26 chars x 5 bits = 130 bits of entropy.
const VERIFICATION_TOKEN_LENGTH: usize = 26;

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User (U_)
    User,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
        }
    }
}

fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate an unguessable Crockford string from the OS random source.
///
/// Used for anything a client can present as proof (session handles,
/// verification tokens), where `thread_rng` convenience is not enough.
fn generate_secret_string(length: usize) -> String {
    (0..length)
        .map(|_| {
            let idx = OsRng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// # Returns
/// A string in format "PREFIX_XXXXXX" (e.g., "U_K7NP3X")
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(6))
}

/// Generate a User ID (U_XXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate an opaque session handle (32 Crockford chars, 160 bits)
pub fn generate_session_token() -> String {
    generate_secret_string(SESSION_TOKEN_LENGTH)
}

/// Generate a single-use verification token (26 Crockford chars, 130 bits)
pub fn generate_verification_token() -> String {
    generate_secret_string(VERIFICATION_TOKEN_LENGTH)
}
