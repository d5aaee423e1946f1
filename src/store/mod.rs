// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Durable key/value store for fetched block payloads.
//!
//! [`PersistentStore`] wraps a single LMDB environment (via `heed`) whose map
//! size is the configured capacity. LMDB readers never wait on the writer, so
//! a [`get`](PersistentStore::get) is at most delayed by the recovery path
//! below, never by an ordinary write.
//!
//! # Capacity recovery
//!
//! When a write fails with `MDB_MAP_FULL` the environment is closed and
//! reopened with the same path and map size, then the write is retried once.
//! Reopening releases pages that were pinned by stale readers or freed-list
//! fragmentation. If the retry fails the same way the caller gets
//! [`StoreError::Full`]; existing entries are untouched either way.
//!
//! # Examples
//!
//! ```rust,no_run
//! use blocktx::{BlockKey, CacheEntry, PersistentStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PersistentStore::open("/var/lib/blocktx", 10 * 1024 * 1024)?;
//! let key = BlockKey::new("4f2a9c01")?;
//! store.put(&key, &CacheEntry::from(b"[]".to_vec()))?;
//! assert!(store.get(&key)?.is_some());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, MdbError};
use tracing::{debug, info, warn};

use crate::errors::StoreError;
use crate::spans;
use crate::types::{entry::CacheEntry, key::BlockKey};

/// Capacity is rounded up to a whole number of pages of this size.
const PAGE_SIZE: usize = 4096;

/// An open LMDB environment and its single unnamed database.
struct Backend {
    env: Env,
    db: Database<Bytes, Bytes>,
    /// Bumped on every reopen so concurrent writers recover only once
    generation: u64,
}

/// Durable, capacity-bounded map from [`BlockKey`] to [`CacheEntry`].
///
/// Safe to share across tasks behind an `Arc`.
pub struct PersistentStore {
    path: PathBuf,
    max_bytes: usize,
    backend: RwLock<Option<Backend>>,
    reopens: AtomicU64,
}

impl PersistentStore {
    /// Opens (or creates) the store at `path` with a capacity of `max_bytes`.
    ///
    /// The directory is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the directory cannot be created
    /// or LMDB refuses to open it.
    pub fn open(path: impl Into<PathBuf>, max_bytes: usize) -> Result<Self, StoreError> {
        let path = path.into();
        let max_bytes = round_to_pages(max_bytes);

        std::fs::create_dir_all(&path).map_err(|e| {
            StoreError::unavailable(&path, "failed to create store directory", e)
        })?;

        let backend = open_backend(&path, max_bytes, 0)?;
        let entries = count_entries(&backend).unwrap_or_default();

        info!(
            path = %path.display(),
            max_bytes = max_bytes,
            entries = entries,
            "Opened transaction store"
        );

        Ok(Self {
            path,
            max_bytes,
            backend: RwLock::new(Some(backend)),
            reopens: AtomicU64::new(0),
        })
    }

    /// Store directory.
    #[cfg(test)]
    fn path(&self) -> &Path {
        &self.path
    }

    /// Number of capacity recoveries performed since opening.
    pub fn reopens(&self) -> u64 {
        self.reopens.load(Ordering::Relaxed)
    }

    /// Looks up the entry stored under `key`.
    pub fn get(&self, key: &BlockKey) -> Result<Option<CacheEntry>, StoreError> {
        let guard = self.backend.read().unwrap_or_else(PoisonError::into_inner);
        let backend = guard.as_ref().ok_or(StoreError::Closed)?;

        let rtxn = backend
            .env
            .read_txn()
            .map_err(|e| StoreError::backend("read", e))?;
        let found = backend
            .db
            .get(&rtxn, key.as_bytes())
            .map_err(|e| StoreError::backend("read", e))?
            .map(CacheEntry::from);

        debug!(key = %key, hit = found.is_some(), "Store lookup");
        Ok(found)
    }

    /// Stores `entry` under `key`, overwriting any previous value.
    ///
    /// Writing the same pair again leaves the store unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Full`] if the write does not fit even after one
    /// close-and-reopen recovery.
    pub fn put(&self, key: &BlockKey, entry: &CacheEntry) -> Result<(), StoreError> {
        let _span = spans::store_put(key, entry.len()).entered();

        let generation = match self.try_put(key, entry) {
            Ok(()) => return Ok(()),
            Err(PutFailure::MapFull { generation }) => generation,
            Err(PutFailure::Store(e)) => return Err(e),
        };

        warn!(
            key = %key,
            len = entry.len(),
            max_bytes = self.max_bytes,
            "Store full, reopening before retrying write"
        );
        self.reopen(generation)?;

        match self.try_put(key, entry) {
            Ok(()) => {
                info!(key = %key, "Write succeeded after store reopen");
                Ok(())
            }
            Err(PutFailure::MapFull { .. }) => Err(StoreError::full(&self.path, self.max_bytes)),
            Err(PutFailure::Store(e)) => Err(e),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<u64, StoreError> {
        let guard = self.backend.read().unwrap_or_else(PoisonError::into_inner);
        let backend = guard.as_ref().ok_or(StoreError::Closed)?;
        count_entries(backend)
    }

    /// True if nothing has been stored yet.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Closes the environment and waits until LMDB has released it.
    ///
    /// Later calls fail with [`StoreError::Closed`]. Blocks, so call it from a
    /// blocking context during shutdown.
    pub fn close(&self) {
        let taken = self
            .backend
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(backend) = taken {
            backend.env.prepare_for_closing().wait();
            info!(path = %self.path.display(), "Closed transaction store");
        }
    }

    fn try_put(&self, key: &BlockKey, entry: &CacheEntry) -> Result<(), PutFailure> {
        let guard = self.backend.read().unwrap_or_else(PoisonError::into_inner);
        let backend = guard.as_ref().ok_or(StoreError::Closed)?;
        let generation = backend.generation;
        let full = move |e: heed::Error| PutFailure::classify(e, generation);

        let mut wtxn = backend.env.write_txn().map_err(full)?;
        backend
            .db
            .put(&mut wtxn, key.as_bytes(), entry.as_bytes())
            .map_err(full)?;
        wtxn.commit().map_err(full)?;
        Ok(())
    }

    /// Closes and reopens the environment unless another writer already did
    /// so since `seen_generation`.
    fn reopen(&self, seen_generation: u64) -> Result<(), StoreError> {
        let mut guard = self.backend.write().unwrap_or_else(PoisonError::into_inner);
        let current = guard.take().ok_or(StoreError::Closed)?;

        if current.generation != seen_generation {
            debug!("Store already reopened by a concurrent writer");
            *guard = Some(current);
            return Ok(());
        }

        let next_generation = current.generation + 1;
        current.env.prepare_for_closing().wait();

        let reopened = open_backend(&self.path, self.max_bytes, next_generation)?;
        *guard = Some(reopened);
        self.reopens.fetch_add(1, Ordering::Relaxed);

        info!(
            path = %self.path.display(),
            generation = next_generation,
            "Reopened transaction store"
        );
        Ok(())
    }
}

impl Drop for PersistentStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore")
            .field("path", &self.path)
            .field("max_bytes", &self.max_bytes)
            .field("reopens", &self.reopens())
            .finish()
    }
}

enum PutFailure {
    MapFull { generation: u64 },
    Store(StoreError),
}

impl PutFailure {
    fn classify(error: heed::Error, generation: u64) -> Self {
        match error {
            heed::Error::Mdb(MdbError::MapFull) => PutFailure::MapFull { generation },
            other => PutFailure::Store(StoreError::backend("write", other)),
        }
    }
}

impl From<StoreError> for PutFailure {
    fn from(error: StoreError) -> Self {
        PutFailure::Store(error)
    }
}

fn open_backend(path: &Path, max_bytes: usize, generation: u64) -> Result<Backend, StoreError> {
    // SAFETY: the environment is opened once per path within this process and
    // only through `PersistentStore`, which closes it before reopening.
    let env = unsafe { EnvOpenOptions::new().map_size(max_bytes).max_dbs(1).open(path) }
        .map_err(|e| StoreError::unavailable(path, "failed to open LMDB environment", e))?;

    let mut wtxn = env
        .write_txn()
        .map_err(|e| StoreError::unavailable(path, "failed to begin setup transaction", e))?;
    let db: Database<Bytes, Bytes> = env
        .create_database(&mut wtxn, None)
        .map_err(|e| StoreError::unavailable(path, "failed to open database", e))?;
    wtxn.commit()
        .map_err(|e| StoreError::unavailable(path, "failed to commit setup transaction", e))?;

    Ok(Backend {
        env,
        db,
        generation,
    })
}

fn count_entries(backend: &Backend) -> Result<u64, StoreError> {
    let rtxn = backend
        .env
        .read_txn()
        .map_err(|e| StoreError::backend("read", e))?;
    backend
        .db
        .len(&rtxn)
        .map_err(|e| StoreError::backend("read", e))
}

fn round_to_pages(bytes: usize) -> usize {
    bytes.max(PAGE_SIZE).div_ceil(PAGE_SIZE) * PAGE_SIZE
}
