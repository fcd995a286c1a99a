// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Token/Nonce Cache
//!
//! Key-value storage with per-key expiry. Every piece of session-scoped state
//! (identity fields, tokens, nonces, the tries counter) lives here.
//!
//! Writing a key resets only that key's expiry. Reads never observe an
//! expired value.
//!
//! Besides plain `set`/`get`/`delete`, backends must provide two atomic
//! primitives used by the handshake to close check-then-act races between
//! concurrent requests for the same session:
//!
//! - [`TokenCache::take`] reads and removes a value in one step
//! - [`TokenCache::take_if`] removes a value only if it equals an expected one

pub mod janitor;
pub mod memory;

use std::time::Duration;

pub use janitor::CacheJanitor;
pub use memory::MemoryCache;

/// A cached value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    Text(String),
    Record(serde_json::Value),
    Integer(i64),
}

impl CacheValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CacheValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CacheValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<serde_json::Value> {
        match self {
            CacheValue::Record(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache lock poisoned")]
    LockPoisoned,

    #[error("cached value under {key} has unexpected type (expected {expected})")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("cached record under {key} could not be decoded: {reason}")]
    Decode { key: String, reason: String },
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Storage contract for session-scoped values.
pub trait TokenCache: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    fn set(&self, key: &str, value: CacheValue, ttl: Duration) -> CacheResult<()>;

    /// Returns `None` if absent or expired.
    fn get(&self, key: &str) -> CacheResult<Option<CacheValue>>;

    fn delete(&self, key: &str) -> CacheResult<()>;

    /// Atomically read and remove `key`.
    fn take(&self, key: &str) -> CacheResult<Option<CacheValue>>;

    /// Atomically remove `key` if it currently holds `expected`.
    ///
    /// Returns `true` when the value matched and was removed. A mismatched
    /// value is left in place.
    fn take_if(&self, key: &str, expected: &CacheValue) -> CacheResult<bool>;

    /// Drop every expired entry, returning how many were removed.
    fn purge_expired(&self) -> CacheResult<usize>;
}
