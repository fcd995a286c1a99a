// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Random capabilities (tokens, nonces) and their stored digests.
//!
//! Tokens are never kept in the cache in plaintext: only the SHA-256 digest is
//! stored, and presented values are hashed before comparison.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

/// Entropy for verification and validation tokens.
pub const TOKEN_BYTES: usize = 32;

/// Entropy for nonces.
pub const NONCE_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
#[error("system random source failed")]
pub struct RandomnessError;

/// URL-safe random string carrying `N` bytes of entropy.
fn random_urlsafe<const N: usize>(rng: &SystemRandom) -> Result<String, RandomnessError> {
    let mut bytes = [0u8; N];
    rng.fill(&mut bytes).map_err(|_| RandomnessError)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Source of fresh tokens and nonces.
#[derive(Clone)]
pub struct TokenIssuer {
    rng: SystemRandom,
}

impl TokenIssuer {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    pub fn token(&self) -> Result<String, RandomnessError> {
        random_urlsafe::<TOKEN_BYTES>(&self.rng)
    }

    pub fn nonce(&self) -> Result<String, RandomnessError> {
        random_urlsafe::<NONCE_BYTES>(&self.rng)
    }
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self::new()
    }
}

/// Digest form of a token as kept in the cache.
pub fn digest(token: &str) -> String {
    Base64UrlUnpadded::encode_string(&Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_urlsafe_and_sized() {
        let issuer = TokenIssuer::new();
        let token = issuer.token().unwrap();
        let nonce = issuer.nonce().unwrap();

        // 32 bytes -> 43 chars, 16 bytes -> 22 chars (unpadded base64)
        assert_eq!(token.len(), 43);
        assert_eq!(nonce.len(), 22);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let issuer = TokenIssuer::new();
        assert_ne!(issuer.token().unwrap(), issuer.token().unwrap());
        assert_ne!(issuer.nonce().unwrap(), issuer.nonce().unwrap());
    }

    #[test]
    fn digest_is_stable_and_hides_input() {
        assert_eq!(digest("abc"), digest("abc"));
        assert_ne!(digest("abc"), digest("abd"));
        assert!(!digest("abc").contains("abc"));
    }
}
