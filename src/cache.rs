// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Cache-aside resolution of block transactions.
//!
//! [`TransactionCache`] ties the three layers together:
//!
//! 1. take the block's lock from the [`KeyedLockRegistry`]
//! 2. look the block up in the [`PersistentStore`]; on a hit, return it
//! 3. on a miss, fetch through the [`FetchOffloader`], write the result to the
//!    store and return it; on failure return the error and store nothing
//!
//! The lock is held across all three steps, so concurrent requests for the
//! same block queue behind the first one and then find its result in the
//! store. That is the single-flight guarantee: one upstream call per block no
//! matter how many callers ask at once. The fetch-then-write step runs in its
//! own task, so it completes even if the caller that started it goes away.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use blocktx::{BlockKey, FetchOffloader, PersistentStore, RNodeClient, TransactionCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PersistentStore::open("transactionsDB", 10 * 1024 * 1024)?;
//! let source = Arc::new(RNodeClient::new("node.example", 40403)?);
//! let offloader = FetchOffloader::new(source, 8, 32);
//! let cache = Arc::new(TransactionCache::new(store, offloader));
//!
//! let entry = cache.resolve(&BlockKey::new("4f2a9c01")?).await?;
//! println!("{} bytes", entry.len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, Instrument};

use crate::errors::{CacheError, FetchError};
use crate::fetch::FetchOffloader;
use crate::locks::KeyedLockRegistry;
use crate::spans;
use crate::store::PersistentStore;
use crate::types::{entry::CacheEntry, key::BlockKey};

/// Statistics about cache performance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Requests served from the store
    pub hits: u64,
    /// Requests that went upstream
    pub misses: u64,
    /// Upstream fetches that failed
    pub fetch_failures: u64,
    /// Store capacity recoveries
    pub store_reopens: u64,
    /// Keys currently locked or awaited
    pub active_keys: usize,
}

impl CacheStats {
    /// Calculates the cache hit rate as a percentage (0.0 to 100.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={}, misses={}, fetch_failures={}, store_reopens={}, active_keys={}, hit_rate={:.1}%",
            self.hits,
            self.misses,
            self.fetch_failures,
            self.store_reopens,
            self.active_keys,
            self.hit_rate()
        )
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetch_failures: AtomicU64,
}

/// Single-flight, cache-aside resolver for block transactions.
///
/// Construct once at startup and share behind an `Arc`.
pub struct TransactionCache {
    store: PersistentStore,
    locks: Arc<KeyedLockRegistry<BlockKey>>,
    offloader: FetchOffloader,
    counters: Counters,
}

impl TransactionCache {
    /// Creates a resolver over an open store and a fetch pool.
    pub fn new(store: PersistentStore, offloader: FetchOffloader) -> Self {
        Self {
            store,
            locks: Arc::new(KeyedLockRegistry::new()),
            offloader,
            counters: Counters::default(),
        }
    }

    /// Returns the transactions of block `key`, fetching them at most once.
    ///
    /// On a miss the fetch and the store write run in a spawned task that
    /// owns the key's lock. Dropping the returned future does not abandon
    /// that work: the entry still lands in the store before the next caller
    /// for the key is admitted.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Fetch`] if the upstream fetch fails (nothing is
    /// cached, a later call retries) and [`CacheError::Store`] if the store
    /// cannot be read or the result cannot be written.
    pub async fn resolve(self: &Arc<Self>, key: &BlockKey) -> Result<CacheEntry, CacheError> {
        self.resolve_locked(key)
            .instrument(spans::resolve(key))
            .await
    }

    async fn resolve_locked(self: &Arc<Self>, key: &BlockKey) -> Result<CacheEntry, CacheError> {
        let guard = self.locks.acquire(key.clone()).await;

        if let Some(entry) = self.store.get(key)? {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(len = entry.len(), "Served from store");
            return Ok(entry);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        info!("Not in store, fetching from upstream");

        let cache = Arc::clone(self);
        let owned_key = key.clone();
        let leader = tokio::spawn(
            async move {
                let result = cache.fetch_and_store(&owned_key).await;
                drop(guard);
                result
            }
            .in_current_span(),
        );

        leader.await.map_err(|e| {
            CacheError::Fetch(FetchError::WorkerFailed {
                block: key.to_string(),
                details: e.to_string(),
            })
        })?
    }

    /// Fetches `key` and writes the result. Runs with the key's lock held.
    async fn fetch_and_store(&self, key: &BlockKey) -> Result<CacheEntry, CacheError> {
        let entry = match self.offloader.submit(key).await {
            Ok(entry) => entry,
            Err(e) => {
                self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        self.store.put(key, &entry)?;
        info!(len = entry.len(), "Stored fetched transactions");
        Ok(entry)
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetch_failures: self.counters.fetch_failures.load(Ordering::Relaxed),
            store_reopens: self.store.reopens(),
            active_keys: self.locks.active_keys(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    /// Stops accepting fetches and closes the store.
    ///
    /// Blocks until LMDB has released the environment; call it from a
    /// blocking context.
    pub fn shutdown(&self) {
        self.offloader.close();
        self.store.close();
        info!(stats = %self.stats(), "Transaction cache shut down");
    }
}

impl fmt::Debug for TransactionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionCache")
            .field("store", &self.store)
            .field("offloader", &self.offloader)
            .field("stats", &self.stats())
            .finish()
    }
}
