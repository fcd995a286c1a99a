// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process LRU cache with per-entry expiry.
//!
//! Capacity is bounded; when full, the least recently used entry is evicted.
//! Expired entries are dropped lazily on access and in bulk by
//! [`MemoryCache::purge_expired`].

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

use super::{CacheError, CacheResult, CacheValue, TokenCache};

/// Cached value + absolute expiry.
struct CacheEntry {
    value: CacheValue,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct MemoryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of entries currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, LruCache<String, CacheEntry>>> {
        self.entries.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Remove `key` and return its value if it was still live.
    fn pop_live(
        cache: &mut LruCache<String, CacheEntry>,
        key: &str,
        now: Instant,
    ) -> Option<CacheValue> {
        cache
            .pop(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value)
    }
}

impl TokenCache for MemoryCache {
    fn set(&self, key: &str, value: CacheValue, ttl: Duration) -> CacheResult<()> {
        let mut cache = self.lock()?;
        cache.put(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn get(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        let now = Instant::now();
        let mut cache = self.lock()?;
        let live = cache
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));
        match live {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                // Expired
                cache.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.lock()?.pop(key);
        Ok(())
    }

    fn take(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        let now = Instant::now();
        let mut cache = self.lock()?;
        Ok(Self::pop_live(&mut cache, key, now))
    }

    fn take_if(&self, key: &str, expected: &CacheValue) -> CacheResult<bool> {
        let now = Instant::now();
        let mut cache = self.lock()?;
        let stored = cache
            .peek(key)
            .map(|entry| (entry.is_live(now), &entry.value == expected));
        match stored {
            Some((true, true)) => {
                cache.pop(key);
                Ok(true)
            }
            Some((false, _)) => {
                // Expired
                cache.pop(key);
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn purge_expired(&self) -> CacheResult<usize> {
        let now = Instant::now();
        let mut cache = self.lock()?;
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            cache.pop(key);
        }
        Ok(expired.len())
    }
}
