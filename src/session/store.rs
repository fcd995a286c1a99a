// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed session record on top of the token cache.
//!
//! Cache keys are built here and nowhere else. Every write carries the
//! session TTL; writing one field never extends the life of another.
//!
//! Pre-session tries counters live in their own cache. Anyone can mint
//! attempts, so filling that cache must never evict a live session.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use super::{tokens::digest, Identity, RecordIds, SessionId, SessionState};
use crate::cache::{CacheError, CacheResult, CacheValue, TokenCache};

#[derive(Debug, Clone, Copy)]
enum Field {
    Identity,
    RecordIds,
    CorrectAddress,
    VerificationToken,
    ValidationToken,
    Nonce,
    State,
    Attempt,
}

impl Field {
    fn as_str(&self) -> &'static str {
        match self {
            Field::Identity => "identity",
            Field::RecordIds => "record_ids",
            Field::CorrectAddress => "correct_address",
            Field::VerificationToken => "verification_token",
            Field::ValidationToken => "validation_token",
            Field::Nonce => "nonce",
            Field::State => "state",
            Field::Attempt => "attempt",
        }
    }
}

fn session_key(session: &SessionId, field: Field) -> String {
    format!("session:{session}:{}", field.as_str())
}

fn tries_key(attempt: &str) -> String {
    format!("attempt:{attempt}:tries")
}

#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<dyn TokenCache>,
    attempts: Arc<dyn TokenCache>,
    ttl: Duration,
}

impl SessionStore {
    /// `cache` holds session fields, `attempts` holds tries counters.
    pub fn new(cache: Arc<dyn TokenCache>, attempts: Arc<dyn TokenCache>, ttl: Duration) -> Self {
        Self {
            cache,
            attempts,
            ttl,
        }
    }

    // -------------------------------------------------------------------------
    // Generic helpers
    // -------------------------------------------------------------------------

    fn put_text(&self, key: String, value: &str) -> CacheResult<()> {
        self.cache.set(&key, CacheValue::Text(value.to_string()), self.ttl)
    }

    fn get_text(&self, key: String) -> CacheResult<Option<String>> {
        match self.cache.get(&key)? {
            None => Ok(None),
            Some(CacheValue::Text(s)) => Ok(Some(s)),
            Some(_) => Err(CacheError::TypeMismatch {
                key,
                expected: "text",
            }),
        }
    }

    fn take_text(&self, key: String) -> CacheResult<Option<String>> {
        match self.cache.take(&key)? {
            None => Ok(None),
            Some(CacheValue::Text(s)) => Ok(Some(s)),
            Some(_) => Err(CacheError::TypeMismatch {
                key,
                expected: "text",
            }),
        }
    }

    fn put_record<T: Serialize>(&self, key: String, value: &T) -> CacheResult<()> {
        let record = serde_json::to_value(value).map_err(|e| CacheError::Decode {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.cache.set(&key, CacheValue::Record(record), self.ttl)
    }

    fn get_record<T: DeserializeOwned>(&self, key: String) -> CacheResult<Option<T>> {
        let Some(value) = self.cache.get(&key)? else {
            return Ok(None);
        };
        let record = value.into_record().ok_or_else(|| CacheError::TypeMismatch {
            key: key.clone(),
            expected: "record",
        })?;
        serde_json::from_value(record)
            .map(Some)
            .map_err(|e| CacheError::Decode {
                key,
                reason: e.to_string(),
            })
    }

    // -------------------------------------------------------------------------
    // Session fields
    // -------------------------------------------------------------------------

    pub fn put_identity(&self, session: &SessionId, identity: &Identity) -> CacheResult<()> {
        self.put_record(session_key(session, Field::Identity), identity)
    }

    pub fn identity(&self, session: &SessionId) -> CacheResult<Option<Identity>> {
        self.get_record(session_key(session, Field::Identity))
    }

    pub fn put_record_ids(&self, session: &SessionId, ids: &RecordIds) -> CacheResult<()> {
        self.put_record(session_key(session, Field::RecordIds), ids)
    }

    pub fn record_ids(&self, session: &SessionId) -> CacheResult<Option<RecordIds>> {
        self.get_record(session_key(session, Field::RecordIds))
    }

    pub fn put_correct_address(&self, session: &SessionId, address: &str) -> CacheResult<()> {
        self.put_text(session_key(session, Field::CorrectAddress), address)
    }

    /// Single use: the address is gone after this call whatever the caller
    /// does with it.
    pub fn take_correct_address(&self, session: &SessionId) -> CacheResult<Option<String>> {
        self.take_text(session_key(session, Field::CorrectAddress))
    }

    pub fn put_verification_token(&self, session: &SessionId, token: &str) -> CacheResult<()> {
        self.put_text(session_key(session, Field::VerificationToken), &digest(token))
    }

    /// Retire the verification token, reporting whether `presented` matched
    /// it. The stored token is removed even on mismatch.
    pub fn retire_verification_token(
        &self,
        session: &SessionId,
        presented: &str,
    ) -> CacheResult<bool> {
        Ok(self
            .take_text(session_key(session, Field::VerificationToken))?
            .is_some_and(|stored| stored == digest(presented)))
    }

    pub fn put_nonce(&self, session: &SessionId, nonce: &str) -> CacheResult<()> {
        self.put_text(session_key(session, Field::Nonce), &digest(nonce))
    }

    /// Consume the current nonce. Any presented value, right or wrong, burns it.
    pub fn consume_nonce(&self, session: &SessionId, presented: &str) -> CacheResult<bool> {
        Ok(self
            .take_text(session_key(session, Field::Nonce))?
            .is_some_and(|stored| stored == digest(presented)))
    }

    pub fn put_validation_token(&self, session: &SessionId, token: &str) -> CacheResult<()> {
        self.put_text(session_key(session, Field::ValidationToken), &digest(token))
    }

    /// Atomically redeem the validation token. A wrong token leaves the
    /// stored one untouched.
    pub fn redeem_validation_token(
        &self,
        session: &SessionId,
        presented: &str,
    ) -> CacheResult<bool> {
        self.cache.take_if(
            &session_key(session, Field::ValidationToken),
            &CacheValue::Text(digest(presented)),
        )
    }

    pub fn put_state(&self, session: &SessionId, state: SessionState) -> CacheResult<()> {
        self.put_text(session_key(session, Field::State), state.as_str())
    }

    /// `None` means no live session.
    pub fn state(&self, session: &SessionId) -> CacheResult<Option<SessionState>> {
        let key = session_key(session, Field::State);
        match self.get_text(key.clone())? {
            None => Ok(None),
            Some(raw) => SessionState::parse(&raw).map(Some).ok_or(CacheError::Decode {
                key,
                reason: format!("unknown session state {raw}"),
            }),
        }
    }

    /// End the session's progress. Later steps see no live session.
    pub fn clear_state(&self, session: &SessionId) -> CacheResult<()> {
        self.cache.delete(&session_key(session, Field::State))
    }

    /// Remember which pre-session attempt produced this session.
    pub fn put_attempt(&self, session: &SessionId, attempt: &str) -> CacheResult<()> {
        self.put_text(session_key(session, Field::Attempt), attempt)
    }

    pub fn attempt(&self, session: &SessionId) -> CacheResult<Option<String>> {
        self.get_text(session_key(session, Field::Attempt))
    }

    // -------------------------------------------------------------------------
    // Pre-session tries counter
    // -------------------------------------------------------------------------

    pub fn tries(&self, attempt: &str) -> CacheResult<Option<u32>> {
        let key = tries_key(attempt);
        match self.attempts.get(&key)? {
            None => Ok(None),
            Some(value) => value
                .as_integer()
                .map(|n| Some(n.clamp(0, i64::from(u32::MAX)) as u32))
                .ok_or(CacheError::TypeMismatch {
                    key,
                    expected: "integer",
                }),
        }
    }

    pub fn put_tries(&self, attempt: &str, tries: u32) -> CacheResult<()> {
        self.attempts
            .set(&tries_key(attempt), CacheValue::Integer(i64::from(tries)), self.ttl)
    }

    pub fn clear_tries(&self, attempt: &str) -> CacheResult<()> {
        self.attempts.delete(&tries_key(attempt))
    }
}
