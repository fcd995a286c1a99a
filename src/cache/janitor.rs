// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cache Janitor
//!
//! Background task that periodically drops expired cache entries so that
//! abandoned sessions do not sit in memory until LRU eviction reaches them.
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::TokenCache;

pub struct CacheJanitor {
    cache: Arc<dyn TokenCache>,
    sweep_interval: Duration,
}

impl CacheJanitor {
    pub fn new(cache: Arc<dyn TokenCache>, sweep_interval: Duration) -> Self {
        Self {
            cache,
            sweep_interval,
        }
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(janitor.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Cache janitor starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Cache janitor shutting down");
                    return;
                }
            }

            self.sweep();
        }
    }

    fn sweep(&self) {
        match self.cache.purge_expired() {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "Cache janitor: purged expired entries"),
            Err(e) => warn!(error = %e, "Cache janitor: sweep failed"),
        }
    }
}
