// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Test helpers for blocktx integration tests
//!
//! Provides a scriptable [`TransactionSource`] so the cache can be exercised
//! without a real upstream node.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use blocktx::{
    BlockKey, CacheEntry, FetchError, FetchOffloader, PersistentStore, TransactionCache,
    TransactionSource,
};
use tempfile::TempDir;

/// Default store capacity for tests
pub const TEST_STORE_BYTES: usize = 10 * 1024 * 1024;

/// Mock upstream that counts calls
///
/// # Example
///
/// ```rust,ignore
/// let source = MockSource::new()
///     .with_delay(Duration::from_millis(50))
///     .failing_first(1);
///
/// let cache = build_cache(source.clone(), store, 4);
/// assert!(cache.resolve(&key("b2")).await.is_err());
/// assert!(cache.resolve(&key("b2")).await.is_ok());
/// assert_eq!(source.calls(), 2);
/// ```
pub struct MockSource {
    calls: AtomicUsize,
    delay: Duration,
    key_delays: HashMap<String, Duration>,
    failures_left: AtomicUsize,
    always_fail: bool,
    payload_len: Option<usize>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            key_delays: HashMap::new(),
            failures_left: AtomicUsize::new(0),
            always_fail: false,
            payload_len: None,
        }
    }

    /// Sleep this long in every fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sleep this long when fetching `key`, overriding the default delay
    pub fn with_key_delay(mut self, key: &str, delay: Duration) -> Self {
        self.key_delays.insert(key.to_string(), delay);
        self
    }

    /// Fail the first `n` fetches with an upstream error
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Fail every fetch with an upstream error
    pub fn always_failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Return `len` filler bytes instead of the default JSON payload
    pub fn with_payload_len(mut self, len: usize) -> Self {
        self.payload_len = Some(len);
        self
    }

    /// Number of fetches started so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionSource for MockSource {
    fn fetch_transactions(&self, key: &BlockKey) -> Result<CacheEntry, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self
            .key_delays
            .get(key.as_str())
            .copied()
            .unwrap_or(self.delay);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let scripted_failure = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if self.always_fail || scripted_failure {
            return Err(FetchError::upstream(
                key.as_str(),
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "mock upstream down"),
            ));
        }

        Ok(match self.payload_len {
            Some(len) => CacheEntry::new(vec![b'x'; len]),
            None => CacheEntry::new(payload_for(key.as_str())),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Payload the mock returns for `key` by default
pub fn payload_for(key: &str) -> Vec<u8> {
    format!(r#"[[{{"block":"{key}"}}]]"#).into_bytes()
}

pub fn key(id: &str) -> BlockKey {
    BlockKey::new(id).expect("valid test key")
}

/// Opens a store in a fresh temporary directory
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub fn temp_store(max_bytes: usize) -> (TempDir, PersistentStore) {
    let dir = TempDir::new().expect("create temp dir");
    let store = PersistentStore::open(dir.path().join("transactions"), max_bytes)
        .expect("open temp store");
    (dir, store)
}

/// Builds a cache over `store` fetching from `source` with `pool_size` workers
pub fn build_cache(
    source: Arc<MockSource>,
    store: PersistentStore,
    pool_size: usize,
) -> Arc<TransactionCache> {
    Arc::new(TransactionCache::new(
        store,
        FetchOffloader::new(source, pool_size, pool_size * 4),
    ))
}
