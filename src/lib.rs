// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! # blocktx
//!
//! A caching front for per-block transaction reports.
//!
//! Clients ask for the transactions of a block by its identifier. The first
//! request fetches the report from the upstream node, stores it in a local
//! LMDB environment and returns it; every later request is answered from the
//! store. Concurrent requests for the same block trigger a single upstream
//! fetch.
//!
//! ## Layers
//!
//! - [`PersistentStore`]: bounded key-value store, recovers once when full
//! - [`KeyedLockRegistry`]: one async lock per block, reclaimed when unused
//! - [`FetchOffloader`]: bounded blocking pool for upstream calls
//! - [`TransactionCache`]: lock, look up, fetch on miss, store, return
//! - [`api::router`]: the HTTP surface
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use blocktx::{BlockKey, FetchOffloader, PersistentStore, RNodeClient, TransactionCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PersistentStore::open("transactionsDB", 10 * 1024 * 1024)?;
//! let source = Arc::new(RNodeClient::new("node.example", 40403)?);
//! let cache = Arc::new(TransactionCache::new(store, FetchOffloader::new(source, 8, 32)));
//!
//! let entry = cache.resolve(&BlockKey::new("4f2a9c01")?).await?;
//! println!("{}", String::from_utf8_lossy(entry.as_bytes()));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod bootstrap;
mod cache;
pub mod config;
pub mod errors;
mod fetch;
mod locks;
pub(crate) mod spans;
mod store;
pub mod types;
pub mod upstream;

pub use api::{router, ApiError};
pub use cache::{CacheStats, TransactionCache};
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use errors::{CacheError, ConfigError, FetchError, KeyError, StoreError};
pub use fetch::FetchOffloader;
pub use locks::{KeyGuard, KeyedLockRegistry};
pub use store::PersistentStore;
pub use types::{
    entry::CacheEntry,
    key::{BlockKey, MAX_KEY_LEN},
};
pub use upstream::{RNodeClient, TransactionSource};
