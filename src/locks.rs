// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-key mutual exclusion with bounded memory.
//!
//! [`KeyedLockRegistry`] hands out one async mutex per key. Each map slot
//! carries a count of the requests holding or waiting on it; the slot is
//! removed when that count returns to zero, so the map only ever holds keys
//! that are in use right now.
//!
//! Looking a slot up, creating it if missing, and bumping its count happen
//! under one synchronous lock. Two requests arriving together can therefore
//! never end up with two different mutexes for the same key.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use blocktx::KeyedLockRegistry;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = Arc::new(KeyedLockRegistry::<String>::new());
//!
//! let guard = registry.acquire("b1".to_string()).await;
//! assert_eq!(registry.active_keys(), 1);
//!
//! guard.release();
//! assert_eq!(registry.active_keys(), 0);
//! # }
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Requests holding or waiting on `lock`
    refs: usize,
}

/// Registry of per-key async locks.
///
/// Waiters on the same key are admitted in arrival order (tokio's mutex is
/// fair). Keys never contend with each other.
pub struct KeyedLockRegistry<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K> KeyedLockRegistry<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until no one else holds `key`'s lock, then takes it.
    ///
    /// The lock is released when the returned guard is dropped. Dropping this
    /// future while it waits gives up the place in the queue without leaking
    /// the slot.
    pub async fn acquire(self: &Arc<Self>, key: K) -> KeyGuard<K> {
        let lease = self.lease(key);
        let guard = Arc::clone(&lease.lock).lock_owned().await;
        KeyGuard {
            _guard: guard,
            lease,
        }
    }

    /// Takes `key`'s lock if it is free right now.
    #[cfg(test)]
    fn try_acquire(self: &Arc<Self>, key: K) -> Option<KeyGuard<K>> {
        let lease = self.lease(key);
        let guard = Arc::clone(&lease.lock).try_lock_owned().ok()?;
        Some(KeyGuard {
            _guard: guard,
            lease,
        })
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lease(self: &Arc<Self>, key: K) -> Lease<K> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(key.clone()).or_insert_with(|| Slot {
            lock: Arc::new(AsyncMutex::new(())),
            refs: 0,
        });
        slot.refs += 1;
        trace!(refs = slot.refs, "Leased key lock");

        Lease {
            registry: Arc::clone(self),
            lock: Arc::clone(&slot.lock),
            key,
        }
    }

    fn give_back(&self, key: &K) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(key) {
            slot.refs -= 1;
            if slot.refs == 0 {
                slots.remove(key);
                trace!("Reclaimed key lock");
            }
        }
    }
}

impl<K> Default for KeyedLockRegistry<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// One counted reference to a slot, returned to the registry on drop.
struct Lease<K>
where
    K: Eq + Hash + Clone,
{
    registry: Arc<KeyedLockRegistry<K>>,
    lock: Arc<AsyncMutex<()>>,
    key: K,
}

impl<K> Drop for Lease<K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        self.registry.give_back(&self.key);
    }
}

/// Exclusive hold on one key's lock.
///
/// Dropping the guard (or calling [`release`](Self::release)) unlocks the key
/// and admits the next waiter.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyGuard<K>
where
    K: Eq + Hash + Clone,
{
    // Field order matters: unlock before giving the slot back.
    _guard: OwnedMutexGuard<()>,
    lease: Lease<K>,
}

impl<K> KeyGuard<K>
where
    K: Eq + Hash + Clone,
{
    /// The key this guard holds.
    pub fn key(&self) -> &K {
        &self.lease.key
    }

    /// Unlocks the key.
    pub fn release(self) {
        drop(self);
    }
}
