// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the blocktx service.
//!
//! This module follows a hybrid approach:
//!
//! - **Module-specific errors** for fine-grained handling ([`StoreError`],
//!   [`FetchError`], [`KeyError`], [`ConfigError`])
//! - **Unified error type** ([`CacheError`]) returned by
//!   [`TransactionCache::resolve`](crate::TransactionCache::resolve)
//!
//! # Examples
//!
//! ```rust,ignore
//! use blocktx::{BlockKey, CacheError, FetchError, StoreError};
//!
//! match cache.resolve(&BlockKey::new("abc123")?).await {
//!     Ok(entry) => println!("{} bytes", entry.len()),
//!     Err(CacheError::Fetch(FetchError::Timeout { .. })) => {
//!         eprintln!("upstream too slow, safe to retry later");
//!     }
//!     Err(CacheError::Store(StoreError::Full { .. })) => {
//!         eprintln!("store capacity exhausted");
//!     }
//!     Err(e) => eprintln!("other error: {e}"),
//! }
//! ```

mod config;
mod fetch;
mod key;
mod store;

pub use config::ConfigError;
pub use fetch::FetchError;
pub use key::KeyError;
pub use store::StoreError;

/// Unified error type for [`TransactionCache::resolve`](crate::TransactionCache::resolve).
///
/// Both module errors convert via `From`, so `?` propagates them naturally.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Error from the persistent store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error from the upstream fetch. Nothing was cached.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

impl CacheError {
    /// Returns true if a later request for the same key may succeed.
    ///
    /// Fetch failures never leave anything behind in the store, so they are
    /// always retryable. A store that stays full after recovery is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CacheError::Fetch(_) => true,
            CacheError::Store(e) => !matches!(e, StoreError::Full { .. } | StoreError::Closed),
        }
    }
}
