// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Span creation helpers for blocktx operations.
//!
//! Telemetry is kept out of the business logic: instead of `#[instrument]`
//! attributes, each instrumented operation has a span helper here.
//!
//! Usage pattern:
//! ```rust,ignore
//! pub async fn my_operation(&self, key: &BlockKey) -> Result<T> {
//!     async { /* business logic */ }
//!         .instrument(spans::my_operation(key))
//!         .await
//! }
//! ```

use tracing::{Level, Span};

use crate::types::key::BlockKey;

/// Create span for resolving one block through the cache.
///
/// Parent: HTTP request span
/// Children: fetch span (on a miss), store_put span
#[inline]
pub(crate) fn resolve(key: &BlockKey) -> Span {
    tracing::span!(Level::INFO, "blocktx.resolve", key = %key)
}

/// Create span for one offloaded upstream fetch.
///
/// Parent: resolve span
/// Children: none (the upstream call runs on a blocking worker)
#[inline]
pub(crate) fn fetch(key: &BlockKey, source: &'static str) -> Span {
    tracing::debug_span!("blocktx.fetch", key = %key, source = source)
}

/// Create span for a store write, including a possible reopen.
///
/// Parent: resolve span
#[inline]
pub(crate) fn store_put(key: &BlockKey, len: usize) -> Span {
    tracing::debug_span!("blocktx.store_put", key = %key, len = len)
}
