// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Bounded offloading of blocking upstream fetches.
//!
//! [`FetchOffloader`] runs [`TransactionSource::fetch_transactions`] on
//! tokio's blocking pool while the calling task stays suspended. Two
//! semaphores bound the work:
//!
//! - `workers` (pool size) caps how many upstream calls run at once
//! - `admission` (pool size + queue capacity) caps running plus waiting
//!   fetches; past that, [`submit`](FetchOffloader::submit) fails fast with
//!   [`FetchError::Overloaded`]
//!
//! Both permits move into the blocking closure. A fetch abandoned by a
//! timeout keeps its slot until the upstream call actually returns, so the
//! worker bound holds even while the upstream hangs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, warn, Instrument};

use crate::errors::FetchError;
use crate::spans;
use crate::types::{entry::CacheEntry, key::BlockKey};
use crate::upstream::TransactionSource;

/// Runs blocking upstream fetches on a bounded set of workers.
pub struct FetchOffloader {
    source: Arc<dyn TransactionSource>,
    workers: Arc<Semaphore>,
    admission: Arc<Semaphore>,
    pool_size: usize,
    admission_capacity: usize,
    timeout: Option<Duration>,
}

impl FetchOffloader {
    /// Creates an offloader running at most `pool_size` fetches at once.
    ///
    /// Up to `queue_capacity` further fetches may wait for a worker.
    /// `pool_size` is clamped to at least one.
    pub fn new(source: Arc<dyn TransactionSource>, pool_size: usize, queue_capacity: usize) -> Self {
        let pool_size = pool_size.max(1);
        let admission_capacity = pool_size.saturating_add(queue_capacity);
        Self {
            source,
            workers: Arc::new(Semaphore::new(pool_size)),
            admission: Arc::new(Semaphore::new(admission_capacity)),
            pool_size,
            admission_capacity,
            timeout: None,
        }
    }

    /// Sets the per-fetch timeout, covering both queueing and the upstream call.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Workers not currently running a fetch.
    #[cfg(test)]
    fn idle_workers(&self) -> usize {
        self.workers.available_permits()
    }

    /// Fetches `key` on a worker and waits for the result.
    ///
    /// # Errors
    ///
    /// Upstream failures are returned as-is. Additionally:
    /// [`FetchError::Overloaded`] when the admission limit is reached,
    /// [`FetchError::Timeout`] when the configured timeout expires,
    /// [`FetchError::PoolClosed`] after [`close`](Self::close), and
    /// [`FetchError::WorkerFailed`] if the fetch panicked.
    pub async fn submit(&self, key: &BlockKey) -> Result<CacheEntry, FetchError> {
        let admitted = Arc::clone(&self.admission)
            .try_acquire_owned()
            .map_err(|e| match e {
                TryAcquireError::Closed => FetchError::PoolClosed,
                TryAcquireError::NoPermits => FetchError::Overloaded {
                    capacity: self.admission_capacity,
                },
            })?;

        let span = spans::fetch(key, self.source.name());
        let run = self.run_on_worker(key, admitted);

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .instrument(span)
                .await
                .unwrap_or_else(|_| {
                    Err(FetchError::Timeout {
                        block: key.to_string(),
                        after: limit,
                    })
                }),
            None => run.instrument(span).await,
        };

        match &result {
            Ok(entry) => debug!(key = %key, len = entry.len(), "Fetch completed"),
            Err(e) => warn!(key = %key, error = %e, "Fetch failed"),
        }
        result
    }

    async fn run_on_worker(
        &self,
        key: &BlockKey,
        admitted: OwnedSemaphorePermit,
    ) -> Result<CacheEntry, FetchError> {
        let worker = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::PoolClosed)?;

        debug!(key = %key, "Dispatching fetch to worker");
        let source = Arc::clone(&self.source);
        let owned_key = key.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _permits = (admitted, worker);
            source.fetch_transactions(&owned_key)
        });

        task.await.map_err(|e| FetchError::WorkerFailed {
            block: key.to_string(),
            details: e.to_string(),
        })?
    }

    /// Stops admitting fetches; in-flight fetches run to completion.
    pub fn close(&self) {
        self.admission.close();
        self.workers.close();
    }
}

impl std::fmt::Debug for FetchOffloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOffloader")
            .field("source", &self.source.name())
            .field("pool_size", &self.pool_size)
            .field("admission_capacity", &self.admission_capacity)
            .field("timeout", &self.timeout)
            .finish()
    }
}
