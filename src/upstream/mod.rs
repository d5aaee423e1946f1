// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Upstream transaction sources.
//!
//! The cache talks to the upstream only through [`TransactionSource`]. The
//! call is blocking and [`FetchOffloader`](crate::FetchOffloader) runs it on
//! a bounded pool of blocking workers, so implementations may use synchronous
//! clients.
//!
//! # Example: a fixed in-memory source
//!
//! ```rust
//! use blocktx::{BlockKey, CacheEntry, FetchError, TransactionSource};
//!
//! struct Fixed(&'static [u8]);
//!
//! impl TransactionSource for Fixed {
//!     fn fetch_transactions(&self, _key: &BlockKey) -> Result<CacheEntry, FetchError> {
//!         Ok(CacheEntry::from(self.0))
//!     }
//! }
//!
//! let source = Fixed(b"[]");
//! let entry = source.fetch_transactions(&BlockKey::new("b1").unwrap()).unwrap();
//! assert_eq!(entry.as_bytes(), b"[]");
//! ```

mod rnode;
pub mod types;

pub use rnode::RNodeClient;

use crate::errors::FetchError;
use crate::types::{entry::CacheEntry, key::BlockKey};

/// Blocking source of a block's rendered transaction payload.
pub trait TransactionSource: Send + Sync + 'static {
    /// Fetches and renders the transactions of block `key`.
    ///
    /// Runs on a blocking worker thread. Failures must be returned, not
    /// panicked; a panic is reported as [`FetchError::WorkerFailed`].
    fn fetch_transactions(&self, key: &BlockKey) -> Result<CacheEntry, FetchError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "upstream"
    }
}
